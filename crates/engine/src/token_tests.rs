// SPDX-License-Identifier: MIT

use super::*;

const NOW: u64 = 1_700_000_000_000;

#[test]
fn issue_decode_round_trip() {
    let service = TokenService;
    let token = service.issue("e1", "design", NOW);
    let payload = service.decode(&token).unwrap();
    assert_eq!(payload.execution_id, "e1");
    assert_eq!(payload.step_name, "design");
    assert_eq!(payload.issued_at_ms().unwrap(), NOW);
    assert_eq!(payload.nonce.len(), 22);
}

#[test]
fn tokens_are_unique_per_issue() {
    let service = TokenService;
    let a = service.issue("e1", "design", NOW);
    let b = service.issue("e1", "design", NOW);
    assert_ne!(a, b, "nonce must differ");
}

#[test]
fn validate_accepts_fresh_token() {
    let service = TokenService;
    let token = service.issue("e1", "design", NOW);
    assert!(service.validate(&token, NOW + 1_000).is_ok());
}

#[test]
fn validate_rejects_garbage() {
    let service = TokenService;
    for bad in ["", "not base64 !!", "bm90IGpzb24"] {
        let err = service.validate(bad, NOW).unwrap_err();
        assert!(matches!(err, EngineError::TokenMalformed(_)), "{bad:?} gave {err:?}");
    }
}

#[test]
fn validate_rejects_expired_token() {
    let service = TokenService;
    let token = service.issue("e1", "design", NOW);
    let err = service.validate(&token, NOW + TOKEN_TTL_MS + 1).unwrap_err();
    assert!(matches!(err, EngineError::TokenExpired));
}

#[test]
fn validate_accepts_token_at_exact_ttl() {
    let service = TokenService;
    let token = service.issue("e1", "design", NOW);
    assert!(service.validate(&token, NOW + TOKEN_TTL_MS).is_ok());
}

#[test]
fn validate_rejects_future_token_beyond_skew() {
    let service = TokenService;
    let token = service.issue("e1", "design", NOW + CLOCK_SKEW_MS + 1_000);
    let err = service.validate(&token, NOW).unwrap_err();
    assert!(matches!(err, EngineError::TokenMalformed(_)));

    // within the skew margin is fine
    let near = service.issue("e1", "design", NOW + CLOCK_SKEW_MS - 1_000);
    assert!(service.validate(&near, NOW).is_ok());
}

#[test]
fn payload_with_unparseable_issued_at_is_malformed() {
    let payload = TokenPayload {
        execution_id: "e1".to_string(),
        step_name: "design".to_string(),
        issued_at: "yesterday".to_string(),
        nonce: "n".to_string(),
    };
    assert!(matches!(payload.issued_at_ms(), Err(EngineError::TokenMalformed(_))));
}
