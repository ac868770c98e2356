//! Result marshaling: splits captured outputs into regular returns and an
//! optional trailing failure.

use crate::envelope::ResultEnvelope;
use crate::signature::Signature;
use crate::value::Value;

/// Builds the result envelope for a completed call.
///
/// `outputs` are the captured return values in declared order. When the
/// signature's last return is failure-kind, that slot becomes `error` if it
/// is non-null and is never included in `returns`. A callable whose only
/// return is a failure that did not occur yields `returns: [null]`.
#[must_use]
pub fn marshal(
    id: Option<String>,
    signature: &Signature,
    mut outputs: Vec<Value>,
) -> ResultEnvelope {
    let mut envelope = ResultEnvelope {
        id,
        ..ResultEnvelope::default()
    };

    if !signature.last_is_failure() {
        envelope.returns = Some(outputs);
        return envelope;
    }

    if signature.return_count() == 1 {
        let failure = outputs
            .first()
            .filter(|value| !value.is_null())
            .map(failure_message);
        match failure {
            Some(message) => envelope.error = Some(message),
            None => envelope.returns = Some(outputs),
        }
        return envelope;
    }

    let failure = outputs.pop().filter(|value| !value.is_null());
    envelope.returns = Some(outputs);
    envelope.error = failure.as_ref().map(failure_message);
    envelope
}

fn failure_message(value: &Value) -> String {
    value.to_string()
}
