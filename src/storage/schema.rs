//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.
//! Dates are stored as `YYYY-MM-DD` text and timestamps as RFC 3339 text.

use sea_query::Iden;

/// Per-brand operation mode. One row per brand; shared by adapter and hub.
#[derive(Iden)]
pub enum BrandModes {
    Table,
    #[iden = "brand"]
    Brand,
    #[iden = "mode"]
    Mode,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Unit ↔ channel-manager control mappings.
#[derive(Iden)]
pub enum UnitControlMappings {
    Table,
    #[iden = "unit_id"]
    UnitId,
    #[iden = "external_property_id"]
    ExternalPropertyId,
    #[iden = "external_room_id"]
    ExternalRoomId,
    #[iden = "source_of_truth"]
    SourceOfTruth,
    #[iden = "connection_type"]
    ConnectionType,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Inbound webhook events. `event_id` is unique; rows are never deleted.
#[derive(Iden)]
pub enum WebhookEvents {
    Table,
    #[iden = "event_id"]
    EventId,
    #[iden = "event_type"]
    EventType,
    #[iden = "source"]
    Source,
    #[iden = "payload"]
    Payload,
    #[iden = "status"]
    Status,
    #[iden = "attempts"]
    Attempts,
    #[iden = "max_retries"]
    MaxRetries,
    #[iden = "last_error"]
    LastError,
    #[iden = "received_at"]
    ReceivedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Local bookings.
#[derive(Iden)]
pub enum Bookings {
    Table,
    #[iden = "booking_id"]
    BookingId,
    #[iden = "brand"]
    Brand,
    #[iden = "unit_id"]
    UnitId,
    #[iden = "check_in"]
    CheckIn,
    #[iden = "check_out"]
    CheckOut,
    #[iden = "status"]
    Status,
    #[iden = "guest_reference"]
    GuestReference,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Channel-manager availability flag per unit-night.
#[derive(Iden)]
pub enum ExternalAvailability {
    Table,
    #[iden = "unit_id"]
    UnitId,
    #[iden = "date"]
    Date,
    #[iden = "available"]
    Available,
    #[iden = "event_id"]
    EventId,
    #[iden = "recorded_at"]
    RecordedAt,
}

/// Nights held by channel-manager bookings, one row per booking-night.
#[derive(Iden)]
pub enum ExternalStayNights {
    Table,
    #[iden = "booking_id"]
    BookingId,
    #[iden = "unit_id"]
    UnitId,
    #[iden = "date"]
    Date,
    #[iden = "event_id"]
    EventId,
    #[iden = "recorded_at"]
    RecordedAt,
}

/// Persisted daily occupancy snapshot.
#[derive(Iden)]
pub enum DailyUnitStatus {
    Table,
    #[iden = "unit_id"]
    UnitId,
    #[iden = "building_id"]
    BuildingId,
    #[iden = "date"]
    Date,
    #[iden = "occupancy"]
    Occupancy,
    #[iden = "occupied"]
    Occupied,
    #[iden = "available"]
    Available,
    #[iden = "source"]
    Source,
    #[iden = "monthly_rent_cents"]
    MonthlyRentCents,
}

/// Unit attributes (owned by property CRUD, read here).
#[derive(Iden)]
pub enum Units {
    Table,
    #[iden = "unit_id"]
    UnitId,
    #[iden = "building_id"]
    BuildingId,
    #[iden = "status"]
    Status,
    #[iden = "monthly_rent_cents"]
    MonthlyRentCents,
}

/// Payment ledger (owned by the payment subsystem, read here).
#[derive(Iden)]
pub enum LedgerEntries {
    Table,
    #[iden = "entry_id"]
    EntryId,
    #[iden = "parent_id"]
    ParentId,
    #[iden = "unit_id"]
    UnitId,
    #[iden = "building_id"]
    BuildingId,
    #[iden = "kind"]
    Kind,
    #[iden = "status"]
    Status,
    #[iden = "amount_cents"]
    AmountCents,
    #[iden = "paid_at"]
    PaidAt,
}

/// Audit trail for admin mutations.
#[derive(Iden)]
pub enum AuditLog {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "actor"]
    Actor,
    #[iden = "action"]
    Action,
    #[iden = "subject"]
    Subject,
    #[iden = "detail"]
    Detail,
    #[iden = "at"]
    At,
}

/// Schema statements, executed in order by `init_schema`.
pub const CREATE_TABLES: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS brand_modes (
        brand TEXT PRIMARY KEY,
        mode TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS unit_control_mappings (
        unit_id TEXT PRIMARY KEY,
        external_property_id TEXT NOT NULL,
        external_room_id TEXT,
        source_of_truth TEXT NOT NULL,
        connection_type TEXT,
        updated_at TEXT NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_mappings_external ON unit_control_mappings(external_property_id)",
    r#"CREATE TABLE IF NOT EXISTS webhook_events (
        event_id TEXT PRIMARY KEY,
        event_type TEXT NOT NULL,
        source TEXT NOT NULL,
        payload TEXT NOT NULL,
        status TEXT NOT NULL,
        attempts INTEGER NOT NULL DEFAULT 0,
        max_retries INTEGER NOT NULL,
        last_error TEXT,
        received_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_webhook_events_status ON webhook_events(status)",
    r#"CREATE TABLE IF NOT EXISTS bookings (
        booking_id TEXT PRIMARY KEY,
        brand TEXT NOT NULL,
        unit_id TEXT NOT NULL,
        check_in TEXT NOT NULL,
        check_out TEXT NOT NULL,
        status TEXT NOT NULL,
        guest_reference TEXT,
        updated_at TEXT NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_bookings_range ON bookings(check_in, check_out)",
    r#"CREATE TABLE IF NOT EXISTS external_availability (
        unit_id TEXT NOT NULL,
        date TEXT NOT NULL,
        available INTEGER NOT NULL,
        event_id TEXT NOT NULL,
        recorded_at TEXT NOT NULL,
        PRIMARY KEY (unit_id, date)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS external_stay_nights (
        booking_id TEXT NOT NULL,
        unit_id TEXT NOT NULL,
        date TEXT NOT NULL,
        event_id TEXT NOT NULL,
        recorded_at TEXT NOT NULL,
        PRIMARY KEY (booking_id, date)
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_external_stay_nights_unit ON external_stay_nights(unit_id, date)",
    r#"CREATE TABLE IF NOT EXISTS daily_unit_status (
        unit_id TEXT NOT NULL,
        building_id TEXT NOT NULL,
        date TEXT NOT NULL,
        occupancy TEXT NOT NULL,
        occupied INTEGER NOT NULL,
        available INTEGER NOT NULL,
        source TEXT NOT NULL,
        monthly_rent_cents INTEGER NOT NULL,
        PRIMARY KEY (unit_id, date)
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_daily_unit_status_date ON daily_unit_status(date, building_id)",
    r#"CREATE TABLE IF NOT EXISTS units (
        unit_id TEXT PRIMARY KEY,
        building_id TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'ACTIVE',
        monthly_rent_cents INTEGER NOT NULL DEFAULT 0
    )"#,
    r#"CREATE TABLE IF NOT EXISTS ledger_entries (
        entry_id TEXT PRIMARY KEY,
        parent_id TEXT,
        unit_id TEXT,
        building_id TEXT,
        kind TEXT NOT NULL,
        status TEXT NOT NULL,
        amount_cents INTEGER NOT NULL,
        paid_at TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS audit_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        actor TEXT NOT NULL,
        action TEXT NOT NULL,
        subject TEXT NOT NULL,
        detail TEXT NOT NULL,
        at TEXT NOT NULL
    )"#,
];
