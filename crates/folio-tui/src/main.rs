use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use folio_core::{
    contact_form_from_config, conversation_from_config, Config, ContactCard, FormStatus,
    InlineImage, ParserKind,
};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Chat with the portfolio assistant from your terminal")]
#[command(version)]
struct Cli {
    /// Gemini model to use (overrides config)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Do not send earlier turns to the model
    #[arg(long, global = true)]
    no_history: bool,

    /// Card extraction strategy: greedy or balanced (overrides config)
    #[arg(long, global = true)]
    parser: Option<ParserKind>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the reply
    Ask {
        /// Your message
        #[arg(default_value = "")]
        message: String,
        /// Image to attach (a business card, a screenshot...)
        #[arg(short, long)]
        image: Option<PathBuf>,
    },
    /// Leave a message through the contact form
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(short, long)]
        message: String,
    },
    /// Write the effective settings (environment keys included) to the config file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    if cli.no_history {
        config.include_history = false;
    }
    if let Some(parser) = cli.parser {
        config.parser = parser;
    }

    match cli.command {
        None => run_tui(&config).await,
        Some(Commands::Ask { message, image }) => {
            logging::init_stderr();
            ask(&config, message, image).await
        }
        Some(Commands::Contact { name, email, message }) => {
            logging::init_stderr();
            contact(&config, name, email, message).await
        }
        Some(Commands::InitConfig) => {
            config.save()?;
            println!("{} {}", "Config written to".green(), Config::get_config_path()?.display());
            Ok(())
        }
    }
}

async fn run_tui(config: &Config) -> Result<()> {
    let log_path = logging::init_file()?;
    tracing::info!(model = %config.model, log = %log_path.display(), "starting folio");

    let conversation = conversation_from_config(config);
    let contact = contact_form_from_config(config);
    let mut app = App::new(conversation, contact, &config.profile.name, &config.model);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn ask(config: &Config, message: String, image: Option<PathBuf>) -> Result<()> {
    let mut conversation = conversation_from_config(config);
    conversation.composer_mut().text = message;
    if let Some(path) = image {
        conversation.composer_mut().attach(InlineImage::from_path(&path)?);
    }

    if !conversation.submit().await {
        println!("{}", folio_core::ai::EMPTY_INPUT_REPLY.yellow());
        return Ok(());
    }

    if let Some(reply) = conversation.transcript().last() {
        println!("{} {}", "IA:".bold().yellow(), reply.display_text);
        if let Some(card) = &reply.card {
            print_card(card);
        }
    }
    Ok(())
}

fn print_card(card: &ContactCard) {
    println!();
    println!("  {}", card.name.bold());
    if !card.role.is_empty() {
        println!("  {}", card.role);
    }
    if let Some(company) = &card.company {
        println!("  {}", company.dimmed());
    }
    for (label, value) in card.contact_lines() {
        println!("  {}{}", format!("{:<9}", label).dimmed(), value.cyan());
    }
    if let Some(summary) = &card.summary {
        println!("  {}", format!("\"{}\"", summary).italic());
    }
}

async fn contact(config: &Config, name: String, email: String, message: String) -> Result<()> {
    let mut form = contact_form_from_config(config);
    form.fields.name = name;
    form.fields.email = email;
    form.fields.message = message;
    if !form.fields.is_complete() {
        anyhow::bail!("name, email and message are all required");
    }

    match form.submit().await {
        FormStatus::Success => println!("{}", "Mensagem enviada! Obrigado pelo contato.".green()),
        status => anyhow::bail!("contact form ended in {:?}", status),
    }
    Ok(())
}
