//! Backend schema names.
//!
//! Tables, functions and buckets the service expects the managed backend to
//! provide.

/// PostgREST tables.
pub mod table {
    /// User profiles, keyed by identity user id.
    pub const PROFILES: &str = "profiles";

    /// Payment records.
    pub const PAYMENTS: &str = "payments";
}

/// PostgREST RPC functions.
pub mod rpc {
    /// `check_admin_status(user_id uuid) returns boolean`.
    ///
    /// Defined `SECURITY DEFINER` so it can read `admin_users` without
    /// tripping that table's own policies.
    pub const CHECK_ADMIN_STATUS: &str = "check_admin_status";
}

/// Storage buckets.
pub mod bucket {
    /// Public bucket holding proof-of-payment uploads.
    pub const PAYMENT_PROOFS: &str = "payment-proofs";
}

/// `select` clause embedding the owner's profile fields into a payment row.
pub const PAYMENT_WITH_OWNER_SELECT: &str = "*,profiles(email,full_name)";
