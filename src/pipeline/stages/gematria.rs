//! Stage 12: for each known language dictionary, score every matching
//! token under the three gematria ciphers; the language with the most
//! hits wins (first-seen tie-break, §9) and its deduplicated word results
//! are kept on the page.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::PipelineError;
use crate::model::{GemAnalysis, PendingPage, WordResult};
use crate::refdata::{score_word, ReferenceData};

pub async fn process(mut page: PendingPage, refdata: &ReferenceData, cancel: &CancellationToken) -> Result<PendingPage, PipelineError> {
    refdata.dictionaries_gate.wait(cancel).await;
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancellation);
    }

    let text = std::fs::read_to_string(&page.ocr_text_path).unwrap_or_default();

    // Insertion-ordered buckets (not a HashMap) so the winner tie-break below
    // is reproducible: ties go to whichever language's dictionary first
    // matched a token, in scan order, not to HashMap iteration order.
    let mut buckets: Vec<(String, Vec<WordResult>)> = Vec::new();
    let languages = refdata.dictionaries.languages();

    for token in text.split_whitespace() {
        let word: String = token.chars().filter(|c| c.is_ascii_alphabetic()).collect::<String>().to_ascii_lowercase();
        if word.is_empty() {
            continue;
        }
        for language in &languages {
            if refdata.dictionaries.contains(language, &word) {
                let result = WordResult { word: word.clone(), score: score_word(&word) };
                match buckets.iter_mut().find(|(lang, _)| lang == language) {
                    Some((_, words)) => words.push(result),
                    None => buckets.push((language.clone(), vec![result])),
                }
            }
        }
    }

    let mut winner: Option<(&str, usize)> = None;
    for (language, words) in &buckets {
        let better = match winner {
            Some((_, best)) => words.len() > best,
            None => true,
        };
        if better {
            winner = Some((language, words.len()));
        }
    }
    let winner = winner.map(|(language, _)| language.to_string());

    page.gematria = buckets
        .into_iter()
        .map(|(language, mut words)| {
            dedup_by_word(&mut words);
            GemAnalysis { language, words }
        })
        .collect();
    page.language = winner;

    page.state = crate::model::PageState::GematriaScored;
    crate::persistence::write_manifest(&page.manifest_path, &page)?;
    info!(id = %page.identifier, language = ?page.language, "gematria scoring complete");
    Ok(page)
}

fn dedup_by_word(words: &mut Vec<WordResult>) {
    let mut seen = std::collections::HashSet::new();
    words.retain(|w| seen.insert(w.word.clone()));
}
