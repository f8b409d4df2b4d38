//! Prompt assembly for the completion provider.

use deckrag_core::types::{PromptMessage, RetrievedPassage, Turn};

/// Separator placed between passages in the context block.
pub const PASSAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Builds the message sequence sent to the model for one turn.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_prompt: String,
}

impl PromptBuilder {
    pub fn new(expertise_domain: &str) -> Self {
        Self {
            system_prompt: system_prompt(expertise_domain),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// System instruction, then the stored history, then the context and query.
    pub fn build(
        &self,
        history: &[Turn],
        passages: &[RetrievedPassage],
        query: &str,
    ) -> Vec<PromptMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(PromptMessage::system(self.system_prompt.clone()));
        messages.extend(history.iter().map(PromptMessage::from));
        messages.push(PromptMessage::user(format!(
            "Contexte des documents:\n{}\n\n{}",
            context_block(passages),
            query
        )));
        messages
    }
}

/// Render passages as `[document | Slide n]` headed blocks.
pub fn context_block(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .map(|p| format!("[{}]\n{}", p.source, p.text))
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR)
}

/// Retrieval query for a correction: the previous question plus the hint.
pub fn correction_query(last_question: &str, utterance: &str, label: &str) -> String {
    format!("{}\n\n{}: {}", last_question, label, utterance)
}

fn system_prompt(expertise_domain: &str) -> String {
    format!(
        "Tu es un assistant expert en {domain}.\n\n\
         CONTEXTE DE CONVERSATION:\n\
         - Tu participes à une conversation continue avec l'utilisateur\n\
         - L'utilisateur peut poser des questions de suivi sur le même sujet\n\
         - TOUJOURS regarder l'historique de la conversation pour comprendre le contexte\n\
         - Si la question fait référence à quelque chose mentionné avant, utilise ce contexte\n\n\
         INSTRUCTIONS DE RÉPONSE:\n\
         1. REGARDE L'HISTORIQUE pour comprendre de quoi on parle\n\
         2. ANALYSE le contexte de la question de l'utilisateur (son rôle, sa situation, son besoin)\n\
         3. UTILISE PRIORITAIREMENT les documents PowerPoint fournis comme base de ta réponse\n\
         4. ENRICHIS ta réponse avec ton expertise pour donner des conseils pratiques et spécifiques\n\
         5. ADAPTE ta réponse au contexte et à la situation de l'utilisateur\n\
         6. CITE TOUJOURS les sources des documents (fichier + numéro de slide) pour les informations tirées des PPT\n\n\
         STRUCTURE DE RÉPONSE:\n\
         - Si les documents contiennent des informations pertinentes: Base ta réponse dessus et enrichis avec ton expertise\n\
         - Si les documents sont partiels: Combine les infos des documents avec tes connaissances pour une réponse complète\n\
         - Si les documents ne couvrent pas le sujet: Donne une réponse experte basée sur les bonnes pratiques\n\n\
         IMPORTANT:\n\
         - Ne dis JAMAIS 'je ne peux pas répondre' ou 'les documents ne contiennent pas'\n\
         - Sois SPÉCIFIQUE au contexte de l'utilisateur (son métier, sa situation)\n\
         - Donne des réponses ACTIONNABLES et PRATIQUES\n\
         - Cite les sources quand tu utilises les documents\n\
         - GARDE LE FIL de la conversation - ne change pas de sujet sans raison\n",
        domain = expertise_domain
    )
}
