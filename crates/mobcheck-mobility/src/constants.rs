//! Fixed protocol literals for the mobility (`TRV`) domain.

/// Protocol domain whose schemas this crate validates against.
pub const DOMAIN: &str = "TRV";

/// Vehicle categories offered for on-demand rides.
pub const ON_DEMAND_VEHICLE: &[&str] = &["AUTO_RICKSHAW", "CAB"];

/// `fulfillment.type` at `on_select`.
pub const FULFILLMENT_TYPE: &str = "DELIVERY";

/// `item.descriptor.code` at `on_select`.
pub const ITEM_DESCRIPTOR_CODE: &str = "RIDE";

/// Keys `order.provider` may carry at `on_select`.
pub const PROVIDER_KEYS: &[&str] = &["id", "descriptor"];

/// `fulfillment.vehicle` carries at most `category` and `variant`.
pub const MAX_VEHICLE_KEYS: usize = 2;

/// Envelope keys every step must carry.
pub const CONTEXT_REQUIRED_KEYS: &[&str] = &[
    "domain",
    "action",
    "version",
    "bap_id",
    "bap_uri",
    "bpp_id",
    "bpp_uri",
    "transaction_id",
    "message_id",
    "timestamp",
];

/// Envelope keys a response must echo from its request.
pub const CONTEXT_ECHOED_KEYS: &[&str] = &["transaction_id", "message_id", "bap_id", "bpp_id"];

/// Stop types.
pub const START_STOP: &str = "START";
pub const END_STOP: &str = "END";
pub const INTERMEDIATE_STOP: &str = "INTERMEDIATE_STOP";

/// Order keys that must not appear before `on_init`.
pub const FORBIDDEN_ORDER_KEYS: &[&str] = &["payments", "cancellation_terms"];
