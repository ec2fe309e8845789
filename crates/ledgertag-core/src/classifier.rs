//! Statistical tag classifier
//!
//! A TF-IDF vectorizer over word unigrams and bigrams feeding a multinomial
//! logistic regression (softmax) model, trained by full-batch gradient
//! descent. The classifier uses its own word pattern on the raw row text,
//! independent of the heuristic tokenizer and its synonym table.
//!
//! Training and prediction both return `Result`; callers degrade to the
//! heuristic scorer on any error instead of keeping a half-trained model.

use std::collections::{BTreeSet, HashMap};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::corpus::TrainingExample;
use crate::error::{Error, Result};
use crate::models::Suggestion;

/// Words of two or more word characters
const WORD_PATTERN: &str = r"(?u)\b\w\w+\b";

/// Sparse feature vector: (feature index, value), indices ascending
pub type SparseVector = Vec<(usize, f64)>;

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    pub enabled: bool,
    pub max_iter: usize,
    pub learning_rate: f64,
    /// L2 penalty on the weights (not the intercepts)
    pub l2: f64,
    /// Stop once the largest gradient component falls below this
    pub tolerance: f64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            enabled: true,
            max_iter: 300,
            learning_rate: 0.5,
            l2: 1e-3,
            tolerance: 1e-6,
        }
    }
}

/// TF-IDF vectorizer over unigrams and bigrams
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    pattern: Regex,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Learn the vocabulary and smoothed IDF weights from documents
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Result<Self> {
        if documents.is_empty() {
            return Err(Error::Training("Cannot fit on empty documents".into()));
        }
        let pattern = Regex::new(WORD_PATTERN)
            .map_err(|e| Error::Training(format!("Invalid word pattern: {}", e)))?;

        // Sorted terms give a stable feature order
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let terms: BTreeSet<String> = analyze(&pattern, doc.as_ref()).into_iter().collect();
            for term in terms {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }
        if doc_freq.is_empty() {
            return Err(Error::Training("Empty vocabulary".into()));
        }

        let mut terms: Vec<(String, usize)> = doc_freq.into_iter().collect();
        terms.sort();

        let n_docs = documents.len() as f64;
        let mut vocabulary = HashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());
        for (idx, (term, df)) in terms.into_iter().enumerate() {
            vocabulary.insert(term, idx);
            idf.push(((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0);
        }

        Ok(Self {
            pattern,
            vocabulary,
            idf,
        })
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.vocabulary.contains_key(term)
    }

    /// L2-normalized TF-IDF vector; empty when no term is in the vocabulary
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in analyze(&self.pattern, text) {
            if let Some(idx) = self.vocabulary.get(&term) {
                *counts.entry(*idx).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();
        vector.sort_by_key(|(idx, _)| *idx);

        let norm = vector.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }
}

/// Lowercased unigrams followed by space-joined bigrams
fn analyze(pattern: &Regex, text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = pattern.find_iter(&lowered).map(|m| m.as_str()).collect();

    let mut terms: Vec<String> = words.iter().map(|w| w.to_string()).collect();
    terms.extend(words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    terms
}

/// Numerically stable softmax
fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let exp: Vec<f64> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.iter().map(|&x| x / sum).collect()
}

/// A trained classifier: vectorizer plus per-class weights
#[derive(Debug, Clone)]
pub struct TrainedModel {
    vectorizer: TfidfVectorizer,
    classes: Vec<String>,
    /// `classes × features`
    weights: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

impl TrainedModel {
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.vocabulary_size()
    }

    fn logits(&self, x: &SparseVector) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.intercepts)
            .map(|(w, b)| b + x.iter().map(|(j, v)| w[*j] * v).sum::<f64>())
            .collect()
    }

    /// Probability for every class, most likely first.
    ///
    /// Fails when the text shares no feature with the training vocabulary:
    /// without evidence the model would only echo the class priors.
    pub fn predict(&self, text: &str) -> Result<Vec<Suggestion>> {
        let x = self.vectorizer.transform(text);
        if x.is_empty() {
            return Err(Error::Prediction("No known features in query".into()));
        }

        let probabilities = softmax(&self.logits(&x));
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(Error::Prediction("Non-finite probability".into()));
        }

        let mut suggestions: Vec<Suggestion> = self
            .classes
            .iter()
            .zip(probabilities)
            .map(|(tag, p)| Suggestion::new(tag.clone(), p))
            .collect();
        suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(suggestions)
    }
}

/// Train a classifier on labeled examples.
///
/// Requires at least two distinct tags and a non-empty vocabulary.
pub fn train(examples: &[TrainingExample], params: &ClassifierParams) -> Result<TrainedModel> {
    let classes: Vec<String> = examples
        .iter()
        .map(|e| e.tag.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if classes.len() < 2 {
        return Err(Error::Training(format!(
            "Need at least 2 distinct tags, found {}",
            classes.len()
        )));
    }

    let texts: Vec<&str> = examples.iter().map(|e| e.text.as_str()).collect();
    let vectorizer = TfidfVectorizer::fit(&texts)?;
    let class_index: HashMap<&str, usize> = classes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    let samples: Vec<(SparseVector, usize)> = examples
        .iter()
        .map(|e| (vectorizer.transform(&e.text), class_index[e.tag.as_str()]))
        .collect();

    let n_classes = classes.len();
    let n_features = vectorizer.vocabulary_size();
    let n_samples = samples.len() as f64;

    let mut model = TrainedModel {
        vectorizer,
        classes,
        weights: vec![vec![0.0; n_features]; n_classes],
        intercepts: vec![0.0; n_classes],
    };

    let mut iterations = 0;
    for _ in 0..params.max_iter {
        iterations += 1;
        let mut grad_w = vec![vec![0.0; n_features]; n_classes];
        let mut grad_b = vec![0.0; n_classes];

        for (x, label) in &samples {
            let probabilities = softmax(&model.logits(x));
            for (class, p) in probabilities.iter().enumerate() {
                let err = p - if class == *label { 1.0 } else { 0.0 };
                grad_b[class] += err;
                for (j, v) in x {
                    grad_w[class][*j] += err * v;
                }
            }
        }

        let mut max_grad: f64 = 0.0;
        for class in 0..n_classes {
            for j in 0..n_features {
                let g = grad_w[class][j] / n_samples + params.l2 * model.weights[class][j];
                model.weights[class][j] -= params.learning_rate * g;
                max_grad = max_grad.max(g.abs());
            }
            let g = grad_b[class] / n_samples;
            model.intercepts[class] -= params.learning_rate * g;
            max_grad = max_grad.max(g.abs());
        }

        if !max_grad.is_finite() {
            return Err(Error::Training("Gradient diverged".into()));
        }
        if max_grad < params.tolerance {
            break;
        }
    }

    let finite = model
        .weights
        .iter()
        .flatten()
        .chain(&model.intercepts)
        .all(|w| w.is_finite());
    if !finite {
        return Err(Error::Training("Non-finite weights after training".into()));
    }

    debug!(
        "Trained classifier: {} classes, {} features, {} iterations",
        n_classes, n_features, iterations
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(text: &str, tag: &str) -> TrainingExample {
        TrainingExample {
            text: text.to_string(),
            tag: tag.to_string(),
        }
    }

    fn corpus() -> Vec<TrainingExample> {
        vec![
            example("coffee beans office", "Coffee"),
            example("office coffee machine", "Coffee"),
            example("monthly rent payment", "Rent"),
            example("rent office building", "Rent"),
            example("printer paper pens", "Supplies"),
        ]
    }

    #[test]
    fn test_analyze_unigrams_and_bigrams() {
        let pattern = Regex::new(WORD_PATTERN).unwrap();
        assert_eq!(
            analyze(&pattern, "Coffee Beans, a Office"),
            vec!["coffee", "beans", "office", "coffee beans", "beans office"]
        );
    }

    #[test]
    fn test_vectorizer_idf_and_norm() {
        let vectorizer = TfidfVectorizer::fit(&["coffee beans", "coffee rent"]).unwrap();
        assert!(vectorizer.contains("coffee"));
        assert!(vectorizer.contains("coffee beans"));
        assert_eq!(vectorizer.vocabulary_size(), 5);

        let x = vectorizer.transform("coffee beans");
        let norm: f64 = x.iter().map(|(_, v)| v * v).sum();
        assert!((norm - 1.0).abs() < 1e-9);

        // Rare terms outweigh common ones
        let weight = |term: &str| {
            let idx = vectorizer.vocabulary[term];
            x.iter().find(|(j, _)| *j == idx).map(|(_, v)| *v).unwrap()
        };
        assert!(weight("beans") > weight("coffee"));
        assert!(vectorizer.transform("zzqxw").is_empty());
    }

    #[test]
    fn test_vectorizer_rejects_empty_vocabulary() {
        assert!(matches!(
            TfidfVectorizer::fit(&["a b c", "!"]),
            Err(Error::Training(_))
        ));
        let empty: [&str; 0] = [];
        assert!(TfidfVectorizer::fit(&empty).is_err());
    }

    #[test]
    fn test_train_requires_two_classes() {
        let examples = vec![example("general stuff", "General"), example("more", "General")];
        let result = train(&examples, &ClassifierParams::default());
        assert!(matches!(result, Err(Error::Training(_))));
    }

    #[test]
    fn test_train_degenerate_vocabulary() {
        let examples = vec![example("a", "One"), example("b", "Two")];
        assert!(train(&examples, &ClassifierParams::default()).is_err());
    }

    #[test]
    fn test_predict_full_distribution() {
        let model = train(&corpus(), &ClassifierParams::default()).unwrap();
        assert_eq!(model.classes(), &["Coffee", "Rent", "Supplies"]);

        let predictions = model.predict("office coffee supplies").unwrap();
        assert_eq!(predictions.len(), 3);
        assert_eq!(predictions[0].tag, "Coffee");

        let total: f64 = predictions.iter().map(|s| s.score).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(predictions.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_predict_rent() {
        let model = train(&corpus(), &ClassifierParams::default()).unwrap();
        let predictions = model.predict("monthly rent").unwrap();
        assert_eq!(predictions[0].tag, "Rent");
    }

    #[test]
    fn test_predict_unknown_text_fails() {
        let model = train(&corpus(), &ClassifierParams::default()).unwrap();
        assert!(matches!(
            model.predict("zzqxw yybbq"),
            Err(Error::Prediction(_))
        ));
    }

    #[test]
    fn test_training_is_deterministic() {
        let a = train(&corpus(), &ClassifierParams::default()).unwrap();
        let b = train(&corpus(), &ClassifierParams::default()).unwrap();
        assert_eq!(
            a.predict("office coffee").unwrap(),
            b.predict("office coffee").unwrap()
        );
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[1000.0, 1000.0, -5.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((p[0] - p[1]).abs() < 1e-12);
    }
}
