//! Session wrapper, binding discovery, and logit calibration.

use std::path::Path;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use promptward_tokenizer::Encoding;

use crate::error::ClassifierError;

/// Epsilon keeping the softmax denominator away from zero.
const SOFTMAX_EPSILON: f32 = 1e-9;

/// Canonical binding names emitted by the reference export.
const CANONICAL_INPUT_IDS: &str = "input_ids";
const CANONICAL_ATTENTION_MASK: &str = "attention_mask";
const CANONICAL_LOGITS: &str = "logits";

/// Resolved tensor names for one loaded graph.
#[derive(Debug, Clone, PartialEq, Eq)]
struct GraphBinding {
    input_ids: String,
    attention_mask: String,
    logits: String,
}

/// Numerically stable two-class softmax returning the class-1 probability.
///
/// Subtracts the max logit before exponentiation so large logits cannot
/// overflow, then divides with a small epsilon in the denominator.
///
/// # Example
///
/// ```rust
/// use promptward_classifier::softmax2;
///
/// // Equal logits split the mass evenly.
/// assert!((softmax2(0.0, 0.0) - 0.5).abs() < 1e-6);
/// // A dominant class-1 logit approaches certainty.
/// assert!(softmax2(-4.0, 4.0) > 0.99);
/// ```
pub fn softmax2(l0: f32, l1: f32) -> f32 {
    let m = l0.max(l1);
    let e0 = (l0 - m).exp();
    let e1 = (l1 - m).exp();
    e1 / (e0 + e1 + SOFTMAX_EPSILON)
}

/// The loaded injection-classification graph.
///
/// Holds one ONNX session for the lifetime of the process. `score` takes
/// `&self`; the session is safe to share across threads.
pub struct DebertaClassifier {
    session: Session,
    binding: GraphBinding,
}

impl DebertaClassifier {
    /// Loads the graph from a file and resolves its tensor bindings.
    ///
    /// # Errors
    ///
    /// [`ClassifierError::Load`] when the session cannot be built and
    /// [`ClassifierError::Signature`] when the graph does not expose at
    /// least two inputs and one output.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();

        let session = Session::builder()
            .map_err(|e| ClassifierError::Load(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ClassifierError::Load(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| ClassifierError::Load(e.to_string()))?;

        let input_names: Vec<String> =
            session.inputs.iter().map(|i| i.name.clone()).collect();
        let output_names: Vec<String> =
            session.outputs.iter().map(|o| o.name.clone()).collect();
        let binding = resolve_binding(&input_names, &output_names)?;

        info!(
            path = %path.display(),
            input_ids = %binding.input_ids,
            attention_mask = %binding.attention_mask,
            logits = %binding.logits,
            "loaded injection classifier"
        );

        Ok(Self { session, binding })
    }

    /// Runs the graph once and returns the injection probability.
    ///
    /// IDs widen to `int64` positionally; the output tensor must carry at
    /// least two logits or the call fails as
    /// [`ClassifierError::MalformedOutput`].
    pub fn score(&self, encoding: &Encoding) -> Result<f32, ClassifierError> {
        let seq_len = encoding.input_ids.len();
        let ids: Vec<i64> = encoding.input_ids.iter().map(|&v| i64::from(v)).collect();
        let mask: Vec<i64> = encoding
            .attention_mask
            .iter()
            .map(|&v| i64::from(v))
            .collect();

        let ids_tensor = Tensor::from_array(([1usize, seq_len], ids))
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        let mask_tensor = Tensor::from_array(([1usize, seq_len], mask))
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let inputs = ort::inputs![
            self.binding.input_ids.as_str() => ids_tensor,
            self.binding.attention_mask.as_str() => mask_tensor,
        ]
        .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let (shape, logits) = outputs[self.binding.logits.as_str()]
            .try_extract_raw_tensor::<f32>()
            .map_err(|e| ClassifierError::MalformedOutput(e.to_string()))?;

        if logits.len() < 2 {
            return Err(ClassifierError::MalformedOutput(format!(
                "expected 2 logits, got {} (shape {shape:?})",
                logits.len()
            )));
        }

        let probability = softmax2(logits[0], logits[1]);
        debug!(
            l0 = logits[0],
            l1 = logits[1],
            probability,
            "classifier scored sequence"
        );
        Ok(probability)
    }
}

/// Resolves graph tensor names: canonical names first, positions otherwise.
fn resolve_binding(
    inputs: &[String],
    outputs: &[String],
) -> Result<GraphBinding, ClassifierError> {
    if inputs.len() < 2 {
        return Err(ClassifierError::Signature(format!(
            "expected 2 inputs, graph declares {}",
            inputs.len()
        )));
    }
    if outputs.is_empty() {
        return Err(ClassifierError::Signature(
            "graph declares no outputs".to_string(),
        ));
    }

    let input_ids = inputs
        .iter()
        .find(|n| n.as_str() == CANONICAL_INPUT_IDS)
        .cloned()
        .unwrap_or_else(|| inputs[0].clone());

    let attention_mask = inputs
        .iter()
        .find(|n| n.as_str() == CANONICAL_ATTENTION_MASK)
        .cloned()
        .unwrap_or_else(|| {
            // Positional fallback: the first input not already bound to IDs.
            inputs
                .iter()
                .find(|n| **n != input_ids)
                .cloned()
                .unwrap_or_else(|| inputs[1].clone())
        });

    let logits = outputs
        .iter()
        .find(|n| n.as_str() == CANONICAL_LOGITS)
        .cloned()
        .unwrap_or_else(|| outputs[0].clone());

    Ok(GraphBinding {
        input_ids,
        attention_mask,
        logits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_softmax_equal_logits() {
        assert!((softmax2(1.5, 1.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_softmax_monotonic() {
        // l1 > l0 implies a score above one half.
        assert!(softmax2(0.0, 0.1) > 0.5);
        assert!(softmax2(-3.0, 2.0) > 0.5);
        assert!(softmax2(2.0, -3.0) < 0.5);
    }

    #[test]
    fn test_softmax_stable_for_large_logits() {
        let p = softmax2(1e30, 2e30);
        assert!(p.is_finite());
        assert!(p > 0.99);

        let p = softmax2(-1e30, -1e30);
        assert!(p.is_finite());
        assert!((p - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_softmax_bounds() {
        for (l0, l1) in [(-50.0, 50.0), (50.0, -50.0), (0.0, 0.0), (88.0, 88.0)] {
            let p = softmax2(l0, l1);
            assert!((0.0..=1.0).contains(&p), "softmax2({l0}, {l1}) = {p}");
        }
    }

    #[test]
    fn test_binding_canonical_names() {
        let binding = resolve_binding(
            &names(&["input_ids", "attention_mask"]),
            &names(&["logits"]),
        )
        .unwrap();
        assert_eq!(binding.input_ids, "input_ids");
        assert_eq!(binding.attention_mask, "attention_mask");
        assert_eq!(binding.logits, "logits");
    }

    #[test]
    fn test_binding_canonical_names_reordered() {
        let binding = resolve_binding(
            &names(&["attention_mask", "input_ids"]),
            &names(&["logits"]),
        )
        .unwrap();
        assert_eq!(binding.input_ids, "input_ids");
        assert_eq!(binding.attention_mask, "attention_mask");
    }

    #[test]
    fn test_binding_positional_fallback() {
        let binding = resolve_binding(
            &names(&["ids.1", "mask.1", "token_type_ids"]),
            &names(&["output.0", "hidden"]),
        )
        .unwrap();
        assert_eq!(binding.input_ids, "ids.1");
        assert_eq!(binding.attention_mask, "mask.1");
        assert_eq!(binding.logits, "output.0");
    }

    #[test]
    fn test_binding_partial_canonical() {
        // Canonical IDs in second position; mask binds to the other input.
        let binding = resolve_binding(
            &names(&["mask.1", "input_ids"]),
            &names(&["out"]),
        )
        .unwrap();
        assert_eq!(binding.input_ids, "input_ids");
        assert_eq!(binding.attention_mask, "mask.1");
    }

    #[test]
    fn test_binding_arity_errors() {
        assert!(matches!(
            resolve_binding(&names(&["only_one"]), &names(&["out"])),
            Err(ClassifierError::Signature(_))
        ));
        assert!(matches!(
            resolve_binding(&names(&["a", "b"]), &[]),
            Err(ClassifierError::Signature(_))
        ));
    }
}
