//! Instructions sent to the model alongside an enrichment bundle.

use serde_json::Error;

use crate::domains::enrichment::EnrichmentBundle;

/// System message configured on the inference client.
pub const SYSTEM_PROMPT: &str = "Você é um especialista em geração de listas de leads B2B no Brasil. \
Identifique e extraia dados da empresa: razão social, CNPJ, sócios ou responsáveis, telefone e canais de contato.";

/// Fixed instruction template. The response must be a single JSON object
/// with exactly these keys; blank strings mark unknown values.
pub const INSTRUCTIONS: &str = r#"Analise os dados combinados abaixo sobre uma empresa e responda SOMENTE com um objeto JSON neste formato:

{
  "RegisteredName": "razão social oficial",
  "CNPJ": "XX.XXX.XXX/XXXX-XX",
  "Contatos": {"Nome": "sócio ou responsável", "Telefone": "", "Email": ""},
  "DataFundacao": "AAAA-MM-DD",
  "Website": "https://...",
  "RedesSociais": {"Facebook": "", "Instagram": "", "TikTok": "", "WhatsApp": ""},
  "AnaliseEmpresa": "resumo curto da empresa",
  "MensagemWhatsApp": "mensagem curta de primeiro contato"
}

Regras:
- Use apenas informações presentes nos dados; deixe vazio ("") o que não for encontrado.
- Prefira o CNPJ com maior pontuação em identifier_search.candidates quando houver.
- Datas sempre no formato AAAA-MM-DD.
- Não escreva nada fora do objeto JSON."#;

/// Bundle plus instructions: the input of one inference call.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub bundle: EnrichmentBundle,
    pub instructions: String,
}

impl ExtractionRequest {
    pub fn new(bundle: EnrichmentBundle) -> Self {
        Self {
            bundle,
            instructions: INSTRUCTIONS.to_string(),
        }
    }

    /// User message: instructions, then the bundle as indented JSON.
    pub fn render(&self) -> Result<String, Error> {
        let data = serde_json::to_string_pretty(&self.bundle)?;
        Ok(format!("{}\n\nDados combinados:\n{}", self.instructions, data))
    }
}
