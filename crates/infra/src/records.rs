//! Storage metadata for each domain type: table, searchable, filterable and
//! sortable fields.

use salonbook_appointments::Appointment;
use salonbook_catalog::ServiceItem;
use salonbook_customers::Customer;
use salonbook_finance::FinanceTransaction;
use salonbook_inventory::{StockItem, StockMovement};
use salonbook_loyalty::{PointsEntry, Voucher};
use salonbook_settings::BusinessSettings;
use salonbook_staff::{AttendanceRecord, PayrollRecord, StaffMember};

use crate::repository::{Direction, FieldKind, Record};

use FieldKind::{Date, Numeric, Text, Timestamp};

impl Record for Customer {
    const RESOURCE: &'static str = "customers";
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "phone", "email", "notes", "tags"];
    const FILTER_FIELDS: &'static [&'static str] = &["gender"];
    const SORT_FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("name", Text),
        ("created_at", Timestamp),
        ("last_visit_at", Timestamp),
        ("visit_count", Numeric),
        ("total_spent", Numeric),
        ("points_balance", Numeric),
    ];
    const DEFAULT_SORT: (&'static str, Direction) = ("name", Direction::Asc);
    const RANGE_FIELD: Option<(&'static str, FieldKind)> = Some(("created_at", Timestamp));
}

impl Record for ServiceItem {
    const RESOURCE: &'static str = "services";
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "category", "description"];
    const FILTER_FIELDS: &'static [&'static str] = &["category", "active"];
    const SORT_FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("name", Text),
        ("category", Text),
        ("price", Numeric),
        ("duration_minutes", Numeric),
        ("created_at", Timestamp),
    ];
    const DEFAULT_SORT: (&'static str, Direction) = ("name", Direction::Asc);
}

impl Record for Appointment {
    const RESOURCE: &'static str = "appointments";
    const SEARCH_FIELDS: &'static [&'static str] = &["notes", "voucher_code", "cancel_reason"];
    const FILTER_FIELDS: &'static [&'static str] = &["status", "customer_id", "staff_id"];
    const SORT_FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("start_at", Timestamp),
        ("total", Numeric),
        ("created_at", Timestamp),
    ];
    const DEFAULT_SORT: (&'static str, Direction) = ("start_at", Direction::Desc);
    const RANGE_FIELD: Option<(&'static str, FieldKind)> = Some(("start_at", Timestamp));
}

impl Record for StaffMember {
    const RESOURCE: &'static str = "staff";
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "role_title", "phone", "email"];
    const FILTER_FIELDS: &'static [&'static str] = &["active", "role_title"];
    const SORT_FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("name", Text),
        ("hired_on", Date),
        ("base_salary", Numeric),
        ("created_at", Timestamp),
    ];
    const DEFAULT_SORT: (&'static str, Direction) = ("name", Direction::Asc);
}

impl Record for AttendanceRecord {
    const RESOURCE: &'static str = "attendance";
    const SEARCH_FIELDS: &'static [&'static str] = &["note"];
    const FILTER_FIELDS: &'static [&'static str] = &["staff_id", "status", "date"];
    const SORT_FIELDS: &'static [(&'static str, FieldKind)] = &[("date", Date), ("check_in", Timestamp)];
    const DEFAULT_SORT: (&'static str, Direction) = ("date", Direction::Desc);
    const RANGE_FIELD: Option<(&'static str, FieldKind)> = Some(("date", Date));
    const UNIQUE_FIELDS: &'static [&'static [&'static str]] = &[&["staff_id", "date"]];
}

impl Record for PayrollRecord {
    const RESOURCE: &'static str = "payroll";
    const SEARCH_FIELDS: &'static [&'static str] = &["staff_name"];
    const FILTER_FIELDS: &'static [&'static str] = &["staff_id", "period_start", "period_end"];
    const SORT_FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("period_start", Date),
        ("net_pay", Numeric),
        ("staff_name", Text),
        ("created_at", Timestamp),
    ];
    const DEFAULT_SORT: (&'static str, Direction) = ("period_start", Direction::Desc);
    const RANGE_FIELD: Option<(&'static str, FieldKind)> = Some(("period_start", Date));
    const UNIQUE_FIELDS: &'static [&'static [&'static str]] = &[&["staff_id", "period_start", "period_end"]];
}

impl Record for StockItem {
    const RESOURCE: &'static str = "inventory";
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "sku", "category"];
    const FILTER_FIELDS: &'static [&'static str] = &["category", "sku", "unit"];
    const SORT_FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("name", Text),
        ("quantity", Numeric),
        ("sell_price", Numeric),
        ("created_at", Timestamp),
    ];
    const DEFAULT_SORT: (&'static str, Direction) = ("name", Direction::Asc);
    const UNIQUE_FIELDS: &'static [&'static [&'static str]] = &[&["sku"]];
}

impl Record for StockMovement {
    const RESOURCE: &'static str = "stock_movements";
    const SEARCH_FIELDS: &'static [&'static str] = &["reason"];
    const FILTER_FIELDS: &'static [&'static str] = &["item_id", "kind"];
    const SORT_FIELDS: &'static [(&'static str, FieldKind)] = &[("created_at", Timestamp), ("delta", Numeric)];
    const DEFAULT_SORT: (&'static str, Direction) = ("created_at", Direction::Desc);
    const RANGE_FIELD: Option<(&'static str, FieldKind)> = Some(("created_at", Timestamp));
}

impl Record for Voucher {
    const RESOURCE: &'static str = "vouchers";
    const SEARCH_FIELDS: &'static [&'static str] = &["code", "description"];
    const FILTER_FIELDS: &'static [&'static str] = &["code", "kind", "active"];
    const SORT_FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("code", Text),
        ("valid_until", Timestamp),
        ("used_count", Numeric),
        ("created_at", Timestamp),
    ];
    const DEFAULT_SORT: (&'static str, Direction) = ("created_at", Direction::Desc);
    const UNIQUE_FIELDS: &'static [&'static [&'static str]] = &[&["code"]];
}

impl Record for PointsEntry {
    const RESOURCE: &'static str = "points";
    const SEARCH_FIELDS: &'static [&'static str] = &["reason", "reference"];
    const FILTER_FIELDS: &'static [&'static str] = &["customer_id", "reference"];
    const SORT_FIELDS: &'static [(&'static str, FieldKind)] = &[("created_at", Timestamp), ("delta", Numeric)];
    const DEFAULT_SORT: (&'static str, Direction) = ("created_at", Direction::Desc);
    const RANGE_FIELD: Option<(&'static str, FieldKind)> = Some(("created_at", Timestamp));
}

impl Record for FinanceTransaction {
    const RESOURCE: &'static str = "finance_transactions";
    const SEARCH_FIELDS: &'static [&'static str] = &["category", "description", "reference"];
    const FILTER_FIELDS: &'static [&'static str] = &["kind", "category", "reference"];
    const SORT_FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("occurred_on", Date),
        ("amount", Numeric),
        ("category", Text),
        ("created_at", Timestamp),
    ];
    const DEFAULT_SORT: (&'static str, Direction) = ("occurred_on", Direction::Desc);
    const RANGE_FIELD: Option<(&'static str, FieldKind)> = Some(("occurred_on", Date));
}

impl Record for BusinessSettings {
    const RESOURCE: &'static str = "settings";
    const SEARCH_FIELDS: &'static [&'static str] = &[];
    const FILTER_FIELDS: &'static [&'static str] = &[];
    const SORT_FIELDS: &'static [(&'static str, FieldKind)] = &[("business_name", Text)];
    const DEFAULT_SORT: (&'static str, Direction) = ("business_name", Direction::Asc);
}
