//! The portfolio subject and the persona the assistant speaks as

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Experience {
    pub company: String,
    pub role: String,
    pub period: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub role: String,
    pub focus: String,
    pub location: String,
    pub email: String,
    pub skills: Vec<String>,
    /// Most recent first
    pub experience: Vec<Experience>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "Marcelo Teixeira".to_string(),
            role: "Desenvolvedor e Analista de Dados e IA".to_string(),
            focus: "Transformar dados em soluções inteligentes, automação, dashboards e modelos preditivos."
                .to_string(),
            location: "São Paulo, Brasil".to_string(),
            email: "contato@marcelo.ai".to_string(),
            skills: [
                "Python",
                "SQL",
                "JavaScript",
                "React",
                "Power BI",
                "AWS",
                "Docker",
                "Machine Learning",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            experience: vec![
                Experience {
                    company: "Tech Solutions Inc.".to_string(),
                    role: "Engenheiro de Dados Pleno".to_string(),
                    period: "2022 - Presente".to_string(),
                },
                Experience {
                    company: "DataCorp".to_string(),
                    role: "Analista de BI".to_string(),
                    period: "2020 - 2022".to_string(),
                },
            ],
        }
    }
}

impl Profile {
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    pub fn latest_experience(&self) -> Option<&Experience> {
        self.experience.first()
    }

    /// Opening assistant turn for a fresh chat
    pub fn greeting(&self) -> String {
        format!(
            "Olá! Sou a IA do {}. Posso analisar imagens de cartões de visita ou responder perguntas sobre o portfólio.",
            self.first_name()
        )
    }

    /// Fixed system instruction: who the subject is, plus the card output contract.
    ///
    /// `history` lines are appended as conversation context when non-empty.
    pub fn system_instruction(&self, history: &[String]) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "Você é um assistente virtual inteligente no portfólio de {}.\n\n",
            self.name
        ));

        prompt.push_str(&format!("Sobre {}:\n", self.first_name()));
        prompt.push_str(&format!("- Profissão: {}.\n", self.role));
        prompt.push_str(&format!("- Foco: {}\n", self.focus));
        if !self.skills.is_empty() {
            prompt.push_str(&format!(
                "- Habilidades Técnicas: {}.\n",
                self.skills.join(", ")
            ));
        }
        if let Some(latest) = self.latest_experience() {
            prompt.push_str(&format!(
                "- Cargo atual: {} na {} ({}).\n",
                latest.role, latest.company, latest.period
            ));
        }
        prompt.push_str(&format!("- Localização: {}.\n", self.location));
        prompt.push_str(&format!("- Contato: {}.\n\n", self.email));

        prompt.push_str(CARD_CONTRACT);

        if !history.is_empty() {
            prompt.push_str("\n\nConversa até agora:\n");
            for line in history {
                prompt.push_str(line);
                prompt.push('\n');
            }
        }

        prompt
    }
}

const CARD_CONTRACT: &str = r#"INSTRUÇÃO ESPECIAL PARA IMAGENS:
Se o usuário enviar uma imagem (como um cartão de visita, crachá, print de LinkedIn ou currículo), sua tarefa principal é extrair os dados e formatar a resposta EXCLUSIVAMENTE como um objeto JSON.

IMPORTANTE: Não use blocos de código markdown (```json). Retorne apenas o JSON puro se encontrar dados de contato.

O formato JSON deve ser estritamente este:
{
  "cardData": {
    "name": "Nome Completo",
    "role": "Cargo ou Título",
    "company": "Empresa (se houver)",
    "email": "Email (se houver)",
    "phone": "Telefone (se houver)",
    "website": "Site ou Link (se houver)",
    "location": "Localização (se houver)",
    "summary": "Uma frase curta e profissional sobre a pessoa baseada na imagem"
  }
}

Se a imagem não for um cartão ou perfil profissional, ou se for apenas texto sem imagem, responda normalmente em texto corrido (Markdown), sendo conciso e prestativo."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_uses_first_name() {
        let profile = Profile::default();
        assert!(profile.greeting().starts_with("Olá! Sou a IA do Marcelo."));
    }

    #[test]
    fn test_system_instruction_embeds_profile() {
        let profile = Profile::default();
        let prompt = profile.system_instruction(&[]);

        assert!(prompt.contains("Marcelo Teixeira"));
        assert!(prompt.contains("Python, SQL"));
        assert!(prompt.contains("Engenheiro de Dados Pleno na Tech Solutions Inc."));
        assert!(prompt.contains("São Paulo, Brasil"));
        assert!(prompt.contains("\"cardData\""));
        assert!(!prompt.contains("Conversa até agora"));
    }

    #[test]
    fn test_system_instruction_appends_history() {
        let history = vec!["user: oi".to_string(), "assistant: olá".to_string()];
        let prompt = Profile::default().system_instruction(&history);
        assert!(prompt.ends_with("Conversa até agora:\nuser: oi\nassistant: olá\n"));
    }

    #[test]
    fn test_partial_profile_fills_defaults() {
        let profile: Profile = serde_json::from_str(r#"{"name": "Ana Lima"}"#).unwrap();
        assert_eq!(profile.first_name(), "Ana");
        assert_eq!(profile.location, "São Paulo, Brasil");
    }
}
