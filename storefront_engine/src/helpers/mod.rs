mod bracket_keys;
mod canonical_json;
mod expiry_policy;
mod payload_value;
mod webhook_signature;

pub use bracket_keys::{flatten, split_key, unflatten, BracketKeyError, MAX_LIST_INDEX};
pub use canonical_json::{canonical_json, JsonEscaping};
pub use expiry_policy::{Clock, ExpiryPolicy, ManualClock, SystemClock, DEFAULT_HOLD_DURATION};
pub use payload_value::{normalize_map_newlines, normalize_newlines, PayloadMap, PayloadValue};
pub use webhook_signature::{
    Canonicalization,
    Newlines,
    PayloadShape,
    SignatureError,
    SignatureReconciler,
    WebhookPayload,
};
