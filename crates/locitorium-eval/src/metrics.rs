//! Country-level top-1 / top-k accuracy.

use std::collections::{BTreeMap, HashMap};

use locitorium_core::{GoldDoc, PredDoc, PredResult, ResolutionStatus};
use serde::{Deserialize, Serialize};

/// Accuracy fractions in `[0, 1]`; all zero when there are no gold mentions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TopkMetrics {
    pub mentions: usize,
    pub top1: f64,
    pub topk: f64,
    pub macro_top1: f64,
    pub macro_topk: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    total: usize,
    top1: usize,
    topk: usize,
}

impl Tally {
    fn rates(&self) -> (f64, f64) {
        if self.total == 0 {
            return (0.0, 0.0);
        }
        let total = self.total as f64;
        (self.top1 as f64 / total, self.topk as f64 / total)
    }
}

fn top1_hit(pred: &PredResult, iso: &str) -> bool {
    pred.status == ResolutionStatus::Resolved
        && pred
            .selected
            .as_ref()
            .is_some_and(|s| s.country_code.as_deref() == Some(iso))
}

fn topk_hit(pred: &PredResult, iso: &str, k: usize) -> bool {
    pred.candidates
        .iter()
        .take(k)
        .any(|c| c.country_code.as_deref() == Some(iso))
}

/// Score predictions against gold by `(doc_id, mention_id)`.
///
/// Top-1 counts resolved mentions whose selected country matches; top-k
/// counts mentions with a matching country among the first `k` offered
/// candidates, whatever was selected. Macro scores average the per-country
/// rates with equal weight. Gold mentions without a prediction count only in
/// the denominators.
pub fn topk_accuracy(gold: &[GoldDoc], preds: &[PredDoc], k: usize) -> TopkMetrics {
    let index: HashMap<&str, HashMap<&str, &PredResult>> = preds
        .iter()
        .map(|doc| {
            let by_mention = doc
                .results
                .iter()
                .map(|r| (r.mention_id.as_str(), r))
                .collect();
            (doc.doc_id.as_str(), by_mention)
        })
        .collect();

    let mut overall = Tally::default();
    let mut per_country: BTreeMap<&str, Tally> = BTreeMap::new();

    for doc in gold {
        let doc_preds = index.get(doc.doc_id.as_str());
        for mention in &doc.mentions {
            let iso = mention.iso_country.as_str();
            let country = per_country.entry(iso).or_default();
            overall.total += 1;
            country.total += 1;

            let Some(pred) = doc_preds.and_then(|m| m.get(mention.mention_id.as_str())) else {
                continue;
            };
            if top1_hit(pred, iso) {
                overall.top1 += 1;
                country.top1 += 1;
            }
            if topk_hit(pred, iso, k) {
                overall.topk += 1;
                country.topk += 1;
            }
        }
    }

    let (top1, topk) = overall.rates();
    let (macro_top1, macro_topk) = if per_country.is_empty() {
        (0.0, 0.0)
    } else {
        let n = per_country.len() as f64;
        let (sum1, sumk) = per_country
            .values()
            .map(Tally::rates)
            .fold((0.0, 0.0), |(a, b), (x, y)| (a + x, b + y));
        (sum1 / n, sumk / n)
    };

    TopkMetrics {
        mentions: overall.total,
        top1,
        topk,
        macro_top1,
        macro_topk,
    }
}
