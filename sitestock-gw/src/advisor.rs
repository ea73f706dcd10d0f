//! Free-text stock query router
//!
//! Answers arbitrary stock questions by grounding the external completion
//! call in a snapshot of the inventory. The snapshot is rendered in a stable
//! order so two calls over an unchanged catalog produce byte-identical
//! context, and every collaborator failure collapses into one fixed fallback
//! reply.

use sitestock_common::db::{self, Material};
use sitestock_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::{error, warn};

use crate::clients::CompletionClient;

/// Fixed reply when the completion collaborator fails or returns nothing
pub const FALLBACK_REPLY: &str =
    "Sorry, I could not process that request right now. Please try again later.";

/// Outbound reply cap for the messaging channel (about two SMS segments)
pub const MAX_REPLY_CHARS: usize = 300;

/// Answer a free-text stock question.
///
/// Rejects empty input before any external call; store failures degrade the
/// context rather than failing the flow; completion failures yield the fixed
/// fallback. The returned reply is already capped to the channel limit.
pub async fn answer_free_text(
    pool: &SqlitePool,
    completion: &dyn CompletionClient,
    from: &str,
    body: &str,
) -> Result<String> {
    if body.trim().is_empty() {
        return Err(Error::InvalidInput("empty message body".to_string()));
    }

    let context = match db::list_materials(pool).await {
        Ok(materials) => build_stock_context(&materials),
        Err(e) => {
            error!("Failed to load stock snapshot for {}: {}", from, e);
            "Current stock levels:\nCould not retrieve stock data.".to_string()
        }
    };

    let prompt = build_prompt(&context, body);

    let reply = match completion.complete(&prompt).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            warn!("Completion returned empty text for {}", from);
            FALLBACK_REPLY.to_string()
        }
        Err(e) => {
            error!("Completion call failed for {}: {}", from, e);
            FALLBACK_REPLY.to_string()
        }
    };

    Ok(truncate_reply(&reply))
}

/// Render the stock snapshot, one line per material, in catalog order
/// (lexicographic by name).
pub fn build_stock_context(materials: &[Material]) -> String {
    let mut context = String::from("Current stock levels:");
    if materials.is_empty() {
        context.push_str("\nNo materials on record.");
        return context;
    }
    for material in materials {
        context.push_str(&format!(
            "\n- {}: {} {}",
            material.name, material.quantity, material.unit
        ));
    }
    context
}

/// Assemble the completion prompt: full stock context first, then the stock
/// level definitions, then the user's question.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Context:\n{}\n\n\
         Stock level definitions:\n\
         - Below stock: quantity < 50\n\
         - Sufficient stock: quantity >= 50\n\
         - High stock: quantity > 100\n\n\
         User query:\n{}\n\n\
         ---\n\
         Based ONLY on the provided context, stock level definitions, and user query, \
         answer the query concisely.",
        context, question
    )
}

/// Cap a reply to the messaging-channel limit, marking the cut with an
/// ellipsis. Counts chars, not bytes, so multi-byte text never splits.
pub fn truncate_reply(reply: &str) -> String {
    if reply.chars().count() <= MAX_REPLY_CHARS {
        return reply.to_string();
    }
    let mut truncated: String = reply.chars().take(MAX_REPLY_CHARS - 3).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::CompletionError;
    // `super::*` re-exports the crate's 1-arg `Result` alias; the CompletionClient
    // impls below need the std 2-arg `Result` the trait signature uses.
    use std::result::Result;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct RecordingCompletion {
        answer: &'static str,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingCompletion {
        fn new(answer: &'static str) -> Self {
            Self {
                answer,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl CompletionClient for RecordingCompletion {
        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.answer.to_string())
        }
    }

    struct FailingCompletion;

    #[async_trait::async_trait]
    impl CompletionClient for FailingCompletion {
        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            Err(CompletionError::Network("connection timed out".to_string()))
        }
    }

    async fn test_pool() -> (SqlitePool, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::init_database(&dir.path().join("test.db")).await.unwrap();
        sqlx::query("DELETE FROM materials").execute(&pool).await.unwrap();
        sqlx::query("INSERT INTO materials (name, unit, quantity) VALUES ('Cement', 'bags', 120)")
            .execute(&pool)
            .await
            .unwrap();
        (pool, dir)
    }

    fn catalog() -> Vec<Material> {
        vec![
            Material {
                id: 1,
                name: "Cement".to_string(),
                unit: "bags".to_string(),
                quantity: 120,
            },
            Material {
                id: 2,
                name: "Sand".to_string(),
                unit: "tonnes".to_string(),
                quantity: 40,
            },
        ]
    }

    #[test]
    fn context_lists_every_material() {
        let context = build_stock_context(&catalog());
        assert!(context.contains("Cement: 120 bags"));
        assert!(context.contains("Sand: 40 tonnes"));
    }

    #[test]
    fn context_is_byte_identical_across_calls() {
        let materials = catalog();
        assert_eq!(
            build_stock_context(&materials),
            build_stock_context(&materials)
        );
    }

    #[test]
    fn prompt_embeds_context_before_question() {
        let context = build_stock_context(&catalog());
        let prompt = build_prompt(&context, "How much cement is left?");

        let context_pos = prompt.find("Cement: 120 bags").unwrap();
        let question_pos = prompt.find("How much cement is left?").unwrap();
        assert!(context_pos < question_pos);
    }

    #[test]
    fn truncation_caps_long_replies() {
        let long = "x".repeat(400);
        let capped = truncate_reply(&long);
        assert_eq!(capped.chars().count(), MAX_REPLY_CHARS);
        assert!(capped.ends_with("..."));

        let short = "all good";
        assert_eq!(truncate_reply(short), short);
    }

    #[tokio::test]
    async fn empty_body_is_rejected_before_any_call() {
        let (pool, _dir) = test_pool().await;
        let completion = RecordingCompletion::new("unused");

        let err = answer_free_text(&pool, &completion, "+255700000001", "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(completion.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_reaches_the_completion_call() {
        let (pool, _dir) = test_pool().await;
        let completion = RecordingCompletion::new("There are 120 bags of cement left.");

        let reply = answer_free_text(&pool, &completion, "+255700000001", "How much cement is left?")
            .await
            .unwrap();

        assert_eq!(reply, "There are 120 bags of cement left.");
        let prompts = completion.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Cement: 120 bags"));
        assert!(prompts[0].contains("How much cement is left?"));
    }

    #[tokio::test]
    async fn collaborator_failure_yields_fixed_fallback() {
        let (pool, _dir) = test_pool().await;

        let reply = answer_free_text(&pool, &FailingCompletion, "+255700000001", "Any sand?")
            .await
            .unwrap();
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn empty_completion_yields_fixed_fallback() {
        let (pool, _dir) = test_pool().await;
        let completion = RecordingCompletion::new("   ");

        let reply = answer_free_text(&pool, &completion, "+255700000001", "Any sand?")
            .await
            .unwrap();
        assert_eq!(reply, FALLBACK_REPLY);
    }
}
