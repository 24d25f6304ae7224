use crate::RefineError;
use kontera_core::TRANSACTION_COLLECTION;
use kontera_llm::CompletionBackend;
use kontera_storage::DocStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentSummary {
    pub unique_texts_processed: usize,
    pub transactions_updated: u64,
    /// The full text → supplier mapping, returned for transparency; only
    /// its effect on the records persists.
    pub supplier_mappings: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SupplierPair {
    text: String,
    supplier_name: String,
}

/// Attach supplier names to transactions via the completion backend.
///
/// Collects the distinct non-empty verification texts store-side, sends
/// them in a single prompt, and fans each mapped supplier out to every
/// transaction whose `verification_text` equals the mapped text. A failed
/// call or unparseable response aborts the pass before any update is
/// issued.
pub async fn enrich<C: CompletionBackend>(
    store: &DocStore,
    backend: &C,
) -> Result<EnrichmentSummary, RefineError> {
    let rows = store
        .query(
            "SELECT DISTINCT json_extract(body, '$.verification_text') AS text \
             FROM documents WHERE collection = ? \
             AND json_extract(body, '$.verification_text') IS NOT NULL \
             AND json_extract(body, '$.verification_text') != ''",
            &[Value::from(TRANSACTION_COLLECTION)],
        )
        .await?;
    let texts: Vec<String> = rows
        .into_iter()
        .filter_map(|row| row.get("text").and_then(Value::as_str).map(str::to_string))
        .collect();

    if texts.is_empty() {
        tracing::info!("no verification texts to classify");
        return Ok(EnrichmentSummary {
            unique_texts_processed: 0,
            transactions_updated: 0,
            supplier_mappings: BTreeMap::new(),
        });
    }

    let prompt = build_supplier_prompt(&texts);
    let response = backend.complete(&prompt).await?;
    let mappings = parse_supplier_mappings(&response)?;

    let mut transactions_updated = 0u64;
    for (text, supplier) in &mappings {
        transactions_updated += store
            .execute(
                "UPDATE documents SET body = json_set(body, '$.supplier_name', ?) \
                 WHERE collection = ? AND json_extract(body, '$.verification_text') = ?",
                &[
                    Value::from(supplier.as_str()),
                    Value::from(TRANSACTION_COLLECTION),
                    Value::from(text.as_str()),
                ],
            )
            .await?;
    }

    tracing::info!(
        unique_texts = texts.len(),
        transactions_updated,
        "enrichment pass finished"
    );
    Ok(EnrichmentSummary {
        unique_texts_processed: texts.len(),
        transactions_updated,
        supplier_mappings: mappings,
    })
}

/// One prompt for the whole batch: the enumerated texts plus a strict
/// output-format instruction.
fn build_supplier_prompt(texts: &[String]) -> String {
    let mut prompt = String::from(
        "The following are verification texts from an accounting ledger. \
         For each one, identify the supplier or vendor it refers to.\n\n",
    );
    for (i, text) in texts.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, text));
    }
    prompt.push_str(
        "\nAnswer with a JSON array only, one object per input text, shaped \
         [{\"text\": \"<verification text>\", \"supplier_name\": \"<supplier>\"}]. \
         Use \"Unknown\" as the supplier_name when you cannot name one with confidence.",
    );
    prompt
}

/// Parse the completion into a text → supplier map. Tolerates a
/// surrounding code fence with or without a language tag; duplicate texts
/// resolve last-write-wins.
fn parse_supplier_mappings(response: &str) -> Result<BTreeMap<String, String>, RefineError> {
    let body = strip_code_fence(response);
    let pairs: Vec<SupplierPair> =
        serde_json::from_str(body).map_err(|e| RefineError::MappingParse(e.to_string()))?;
    Ok(pairs
        .into_iter()
        .map(|pair| (pair.text, pair.supplier_name))
        .collect())
}

fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // the fence line may carry a language tag; drop the whole line
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
