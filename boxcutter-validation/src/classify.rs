//! Classification of apiserver errors into preflight violations vs.
//! genuine transient failures (spec.md §4.3's reason table).
use boxcutter_core::PreflightReason;

const PREFLIGHT_REASONS: &[&str] = &[
    "Unauthorized",
    "Forbidden",
    "AlreadyExists",
    "Conflict",
    "Invalid",
    "BadRequest",
    "MethodNotAllowed",
    "RequestEntityTooLarge",
    "UnsupportedMediaType",
    "NotAcceptable",
    "NotFound",
];

const EMPTY_REASON_ADMISSION_MESSAGE: &str = "failed to create typed patch object";

/// Classify a failed dry-run apply.
///
/// Returns `Some(reason)` when the error should be reported as a preflight
/// violation rather than bubbled up as a transient error (spec.md §7.1).
pub fn classify(err: &kube::Error) -> Option<PreflightReason> {
    let kube::Error::Api(response) = err else {
        return None;
    };
    if PREFLIGHT_REASONS.contains(&response.reason.as_str()) {
        return Some(PreflightReason::AdmissionRejected(response.reason.clone()));
    }
    if response.reason.is_empty() && response.message.contains(EMPTY_REASON_ADMISSION_MESSAGE) {
        return Some(PreflightReason::AdmissionRejected(response.message.clone()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(reason: &str, message: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: message.into(),
            reason: reason.into(),
            code: 409,
        })
    }

    #[test]
    fn classifies_known_reasons_as_preflight() {
        let err = api_error("Conflict", "field manager conflict");
        assert!(matches!(classify(&err), Some(PreflightReason::AdmissionRejected(_))));
    }

    #[test]
    fn classifies_empty_reason_typed_patch_failure_as_preflight() {
        let err = api_error("", "failed to create typed patch object: schema mismatch");
        assert!(classify(&err).is_some());
    }

    #[test]
    fn leaves_unknown_reasons_unclassified() {
        let err = api_error("InternalError", "etcd timeout");
        assert!(classify(&err).is_none());
    }
}
