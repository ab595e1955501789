//! Loyalty domain module: discount vouchers and the customer points ledger.

pub mod points;
pub mod voucher;

pub use points::{PointsAdjustment, PointsEntry, balance, points_for_spend};
pub use voucher::{Voucher, VoucherDraft, VoucherKind, VoucherPatch, normalize_code};
