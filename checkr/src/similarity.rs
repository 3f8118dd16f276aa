//! Lexical similarity between two short texts.
//!
//! TF-IDF vectors are fitted over exactly the documents being compared, then
//! compared with cosine similarity. Tokenization and weighting follow the usual
//! scikit-learn `TfidfVectorizer` defaults so scores line up with that tool:
//! lowercase, tokens of two or more word characters, raw counts, smoothed IDF
//! (`ln((1 + n) / (1 + df)) + 1`) and L2-normalized rows.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("invalid token regex"));

/// Lowercased tokens of two or more word characters, in order of appearance
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// TF-IDF weights fitted over a small corpus
#[derive(Debug, Clone)]
pub struct TfidfModel {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    vectors: Vec<Vec<f64>>,
}

impl TfidfModel {
    /// Fit the vocabulary and IDF over `docs` and vectorize each of them.
    /// Fails when no document contains a single token.
    pub fn fit(docs: &[&str]) -> Result<Self> {
        let tokenized: Vec<Vec<String>> = docs.iter().map(|d| tokenize(d)).collect();

        let mut vocabulary = BTreeMap::new();
        for token in tokenized.iter().flatten() {
            let next = vocabulary.len();
            vocabulary.entry(token.clone()).or_insert(next);
        }
        if vocabulary.is_empty() {
            anyhow::bail!("empty vocabulary; documents contain no tokens");
        }

        let mut df = vec![0usize; vocabulary.len()];
        for tokens in &tokenized {
            let mut seen = vec![false; vocabulary.len()];
            for token in tokens {
                let idx = vocabulary[token];
                if !seen[idx] {
                    seen[idx] = true;
                    df[idx] += 1;
                }
            }
        }

        let n = docs.len() as f64;
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        let vectors = tokenized
            .iter()
            .map(|tokens| {
                let mut v = vec![0.0; vocabulary.len()];
                for token in tokens {
                    v[vocabulary[token]] += 1.0;
                }
                for (w, weight) in v.iter_mut().zip(&idf) {
                    *w *= weight;
                }
                l2_normalize(&mut v);
                v
            })
            .collect();

        Ok(Self {
            vocabulary,
            idf,
            vectors,
        })
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&i| self.idf[i])
    }

    /// Normalized TF-IDF vector of the `i`-th fitted document
    pub fn vector(&self, i: usize) -> Option<&[f64]> {
        self.vectors.get(i).map(Vec::as_slice)
    }
}

fn l2_normalize(v: &mut [f64]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine of the angle between two vectors; 0.0 when either is all zeros
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// TF-IDF cosine similarity of two texts, in [0, 1]
pub fn cosine_similarity(text1: &str, text2: &str) -> Result<f64> {
    let model = TfidfModel::fit(&[text1, text2])?;
    let (a, b) = (&model.vectors[0], &model.vectors[1]);
    Ok(cosine(a, b).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_score_one() {
        let score = cosine_similarity("cats are mammals", "cats are mammals").unwrap();
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_texts_score_zero() {
        let score = cosine_similarity("cats are mammals", "stock prices fell sharply").unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn case_is_ignored() {
        let score = cosine_similarity("Cats Are MAMMALS", "cats are mammals").unwrap();
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn single_character_tokens_are_dropped() {
        assert_eq!(tokenize("a cat, I think, is 1 animal"), vec!["cat", "think", "is", "animal"]);
    }

    #[test]
    fn partial_overlap_matches_reference_value() {
        // docs: "the cat sat", "the dog sat"
        // shared terms idf = 1, unique terms idf = ln(3/2) + 1
        let u = (1.5f64).ln() + 1.0;
        let expected = 2.0 / (2.0 + u * u);
        let score = cosine_similarity("the cat sat", "the dog sat").unwrap();
        assert!((score - expected).abs() < 1e-12, "got {score}, want {expected}");
    }

    #[test]
    fn repeated_terms_raise_tf() {
        let model = TfidfModel::fit(&["rain rain sun", "rain"]).unwrap();
        assert_eq!(model.vocabulary_len(), 2);
        assert_eq!(model.idf("rain"), Some(1.0));
        let v = model.vector(0).unwrap();
        let rain = v[0];
        let sun = v[1];
        assert!(rain > sun);
    }

    #[test]
    fn empty_vocabulary_is_an_error() {
        assert!(cosine_similarity("", "").is_err());
        assert!(cosine_similarity("a !", "? b").is_err());
    }

    #[test]
    fn one_empty_side_scores_zero() {
        assert_eq!(cosine_similarity("", "cats are mammals").unwrap(), 0.0);
    }

    #[test]
    fn score_is_symmetric() {
        let a = "senate passes climate bill";
        let b = "climate bill stalls in the senate again";
        let ab = cosine_similarity(a, b).unwrap();
        let ba = cosine_similarity(b, a).unwrap();
        assert!((ab - ba).abs() < 1e-12);
        assert!(ab > 0.0 && ab < 1.0);
    }
}
