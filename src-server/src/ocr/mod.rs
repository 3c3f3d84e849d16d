//! Receipt OCR
//!
//! A receipt image is sent to a generative vision model which answers with a
//! small JSON document. Models are tried in order until one answers.

mod gemini;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

use crate::domain::ExpenseCategory;

pub use gemini::GeminiBackend;

/// Models tried when none are configured
pub const DEFAULT_MODELS: [&str; 2] = ["gemini-2.5-flash-lite", "gemini-2.5-flash"];

pub const EXTRACTION_PROMPT: &str = r#"You are a meticulous French chartered accountant specialised in reading receipts and invoices issued in France.
Your only job is to extract the key figures from the attached document with exact arithmetic.

STRICT EXTRACTION RULES:
1. "totalTTC" is the final amount paid (often labelled TOTAL, TTC, Montant, or the largest value on the receipt).
2. "totalTVA" is the total tax amount (labelled "TVA", "T.V.A" or "TAX"). If there are several VAT lines you MUST add them up.
3. "totalHT" is the amount before tax.
4. If you find TTC and TVA but no explicit HT, you MUST compute HT = TTC - TVA.
5. If the document shows no VAT at all (VAT exemption, ride without VAT...), answer "totalTVA": 0 and "totalHT" equal to "totalTTC".
6. Answer with decimal numbers (. not ,), never with strings.
7. You MUST pick the expense category from EXACTLY one of these options: "Restaurant / Repas", "Transport (Train, Avion, Taxi)", "Hébergement (Hôtel)", "Logiciels & Licences", "Matériel & Fournitures", "Téléphone & Internet", "Frais Bancaires", or "Autre".

Answer ONLY with this JSON structure (no surrounding word json, no markdown):
{
  "merchantName": "Name of the business at the top of the receipt",
  "category": "One of the exact categories listed above",
  "date": "YYYY-MM-DD",
  "totalTTC": 120.50,
  "totalHT": 100.42,
  "totalTVA": 20.08
}"#;

/// OCR errors
#[derive(Debug, Clone, PartialEq)]
pub enum OcrError {
    /// Missing key or model list
    Configuration(String),
    /// One model call failed
    Backend { model: String, message: String },
    /// Every configured model failed; carries the last failure
    AllModelsFailed(String),
    /// The model answered something that is not the expected JSON
    InvalidFormat,
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::Configuration(msg) => write!(f, "{}", msg),
            OcrError::Backend { model, message } => write!(f, "{}: {}", model, message),
            OcrError::AllModelsFailed(last) => write!(
                f,
                "No OCR model is available for this API key. Last error: {}",
                last
            ),
            OcrError::InvalidFormat => write!(f, "Receipt analysis failed (unexpected format)"),
        }
    }
}

impl std::error::Error for OcrError {}

/// An uploaded receipt
#[derive(Debug, Clone)]
pub struct ReceiptImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Fields extracted from a receipt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptExtraction {
    #[serde(rename = "merchantName")]
    pub merchant_name: Option<String>,
    pub category: ExpenseCategory,
    pub date: Option<String>,
    #[serde(rename = "totalTTC")]
    pub total_ttc: Option<f64>,
    #[serde(rename = "totalHT")]
    pub total_ht: Option<f64>,
    #[serde(rename = "totalTVA")]
    pub total_tva: Option<f64>,
}

/// A generative model able to read an image
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Run one model and return its raw text answer
    async fn generate(&self, model: &str, prompt: &str, image: &ReceiptImage) -> Result<String, OcrError>;
}

/// Strip markdown code fences the model sometimes wraps its JSON in
pub fn strip_code_fences(text: &str) -> String {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    let stripped = match FENCE.get_or_init(|| Regex::new(r"(?i)```(json)?").ok()) {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.replace("```", ""),
    };
    stripped.trim().to_string()
}

fn text_field(answer: &Value, key: &str) -> Option<String> {
    answer
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Numbers, or numeric strings such as "88,00 €"; anything else is dropped
fn amount_field(answer: &Value, key: &str) -> Option<f64> {
    let value = answer.get(key)?;
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_end_matches('€')
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok(),
        _ => None,
    };
    if amount.is_none() && !value.is_null() {
        log::warn!("OCR field {} is not a number: {}", key, value);
    }
    amount.filter(|n| n.is_finite())
}

/// Parse a model answer. Only text that is not JSON is an error; missing or
/// mistyped fields are left empty and the category falls back to "Autre".
pub fn parse_extraction(text: &str) -> Result<ReceiptExtraction, OcrError> {
    let cleaned = strip_code_fences(text);
    let answer: Value = serde_json::from_str(&cleaned).map_err(|e| {
        log::error!("OCR answer is not valid JSON ({}): {}", e, text);
        OcrError::InvalidFormat
    })?;
    if !answer.is_object() {
        log::warn!("OCR answer is JSON but not an object: {}", cleaned);
    }

    let category = match text_field(&answer, "category") {
        Some(label) => {
            let category = ExpenseCategory::from_label(&label);
            if !category.is_recognized() {
                log::warn!(
                    "OCR returned unknown category '{}', using {}",
                    label,
                    ExpenseCategory::Other.as_str()
                );
            }
            category.or_other()
        }
        None => ExpenseCategory::Other,
    };

    Ok(ReceiptExtraction {
        merchant_name: text_field(&answer, "merchantName"),
        category,
        date: text_field(&answer, "date"),
        total_ttc: amount_field(&answer, "totalTTC"),
        total_ht: amount_field(&answer, "totalHT"),
        total_tva: amount_field(&answer, "totalTVA"),
    })
}

/// Try each model in order; the first answer wins
pub async fn analyze_receipt(
    backend: &dyn OcrBackend,
    models: &[String],
    image: &ReceiptImage,
) -> Result<ReceiptExtraction, OcrError> {
    if models.is_empty() {
        return Err(OcrError::Configuration("No OCR model configured".to_string()));
    }

    let mut last_error: Option<OcrError> = None;
    let mut answer = None;

    for model in models {
        match backend.generate(model, EXTRACTION_PROMPT, image).await {
            Ok(text) => {
                log::info!("[OCR] Model {} answered", model);
                answer = Some(text);
                break;
            }
            Err(e) => {
                log::warn!("[OCR] Model {} failed: {}", model, e);
                last_error = Some(e);
            }
        }
    }

    match answer {
        Some(text) => parse_extraction(&text),
        None => Err(OcrError::AllModelsFailed(
            last_error.map(|e| e.to_string()).unwrap_or_default(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers from a fixed table and records the models it was asked for
    struct ScriptedBackend {
        answers: HashMap<String, Result<String, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(answers: &[(&str, Result<&str, &str>)]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(model, answer)| {
                        (
                            model.to_string(),
                            answer.map(str::to_string).map_err(str::to_string),
                        )
                    })
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl OcrBackend for ScriptedBackend {
        async fn generate(&self, model: &str, _prompt: &str, _image: &ReceiptImage) -> Result<String, OcrError> {
            self.calls.lock().unwrap().push(model.to_string());
            match self.answers.get(model) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(message)) => Err(OcrError::Backend {
                    model: model.to_string(),
                    message: message.clone(),
                }),
                None => Err(OcrError::Backend {
                    model: model.to_string(),
                    message: "404 model not found".to_string(),
                }),
            }
        }
    }

    fn models() -> Vec<String> {
        DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
    }

    fn image() -> ReceiptImage {
        ReceiptImage {
            mime_type: "image/jpeg".to_string(),
            bytes: vec![0xff, 0xd8],
        }
    }

    const ANSWER: &str = r#"```json
{"merchantName":"SNCF","category":"Transport (Train, Avion, Taxi)","date":"2025-03-10","totalTTC":88.0,"totalHT":80.0,"totalTVA":8.0}
```"#;

    #[tokio::test]
    async fn test_falls_back_to_second_model() {
        let backend = ScriptedBackend::new(&[
            ("gemini-2.5-flash-lite", Err("quota exceeded")),
            ("gemini-2.5-flash", Ok(ANSWER)),
        ]);

        let extraction = analyze_receipt(&backend, &models(), &image()).await.unwrap();
        assert_eq!(extraction.merchant_name.as_deref(), Some("SNCF"));
        assert_eq!(extraction.category, ExpenseCategory::Transport);
        assert_eq!(extraction.total_ttc, Some(88.0));
        assert_eq!(*backend.calls.lock().unwrap(), models());
    }

    #[tokio::test]
    async fn test_first_success_stops_the_cascade() {
        let backend = ScriptedBackend::new(&[("gemini-2.5-flash-lite", Ok(ANSWER))]);

        analyze_receipt(&backend, &models(), &image()).await.unwrap();
        assert_eq!(backend.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_models_fail_reports_last_error() {
        let backend = ScriptedBackend::new(&[
            ("gemini-2.5-flash-lite", Err("quota exceeded")),
            ("gemini-2.5-flash", Err("permission denied")),
        ]);

        let err = analyze_receipt(&backend, &models(), &image()).await.unwrap_err();
        assert!(matches!(err, OcrError::AllModelsFailed(_)));
        assert!(err.to_string().contains("permission denied"));
    }

    #[tokio::test]
    async fn test_unparseable_answer() {
        let backend = ScriptedBackend::new(&[("gemini-2.5-flash-lite", Ok("Sorry, I cannot read this."))]);

        let err = analyze_receipt(&backend, &models(), &image()).await.unwrap_err();
        assert_eq!(err, OcrError::InvalidFormat);
        assert_eq!(err.to_string(), "Receipt analysis failed (unexpected format)");
    }

    #[test]
    fn test_unknown_category_becomes_other() {
        let extraction = parse_extraction(r#"{"merchantName":"Fnac","category":"Cadeaux","totalTTC":10}"#).unwrap();
        assert_eq!(extraction.category, ExpenseCategory::Other);
        assert!(extraction.date.is_none());
    }

    #[test]
    fn test_null_category_and_string_totals_are_tolerated() {
        let extraction = parse_extraction(
            r#"{"merchantName":"Total","category":null,"date":"2025-03-10","totalTTC":"88.00","totalHT":"73,33 €","totalTVA":true}"#,
        )
        .unwrap();
        assert_eq!(extraction.category, ExpenseCategory::Other);
        assert_eq!(extraction.total_ttc, Some(88.0));
        assert_eq!(extraction.total_ht, Some(73.33));
        assert_eq!(extraction.total_tva, None);
        assert_eq!(extraction.date.as_deref(), Some("2025-03-10"));
    }

    #[test]
    fn test_any_json_answer_is_accepted() {
        let extraction = parse_extraction("[]").unwrap();
        assert_eq!(extraction.category, ExpenseCategory::Other);
        assert!(extraction.merchant_name.is_none());
        assert_eq!(parse_extraction("{\"totalTTC\": 12"), Err(OcrError::InvalidFormat));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```JSON\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_empty_model_list() {
        let backend = ScriptedBackend::new(&[]);
        let err = analyze_receipt(&backend, &[], &image()).await.unwrap_err();
        assert!(matches!(err, OcrError::Configuration(_)));
    }
}
