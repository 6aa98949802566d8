use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::ledger::{PaymentEntry, PaymentRecorder};
use crate::model::{
    Branch, Contract, ContractForm, ContractStatus, Customer, Payment, PaymentMethod,
    PaymentStatus, Vehicle, VehicleForm, VehicleSpec, VehicleType,
};
use crate::{now_iso, AppError};

pub struct DbState {
    path: PathBuf,
}

impl DbState {
    pub fn initialize(db_path: &Path) -> Result<Self, AppError> {
        if let Some(dir) = db_path.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        Self::run_migrations(&mut conn)?;
        log::info!("ledger database ready at {}", db_path.display());

        Ok(Self {
            path: db_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> Result<Connection, AppError> {
        let conn = Connection::open(&self.path)?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        Ok(conn)
    }

    fn run_migrations(conn: &mut Connection) -> Result<(), AppError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS contracts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                branch TEXT NOT NULL,
                customer_firstname TEXT NOT NULL,
                customer_othername TEXT,
                customer_lastname TEXT NOT NULL,
                customer_phone TEXT NOT NULL,
                vehicle_type TEXT NOT NULL,
                vehicle_model TEXT NOT NULL,
                vehicle_year TEXT,
                vehicle_color TEXT,
                vehicle_vin TEXT,
                amount INTEGER NOT NULL,
                installment INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS contract_payments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                contract_id INTEGER NOT NULL,
                week INTEGER NOT NULL,
                amount INTEGER NOT NULL,
                method TEXT NOT NULL,
                status TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                FOREIGN KEY(contract_id) REFERENCES contracts(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS vehicles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                branch TEXT NOT NULL,
                vehicle_type TEXT NOT NULL,
                vehicle_model TEXT NOT NULL,
                vehicle_year TEXT,
                vehicle_color TEXT,
                vehicle_vin TEXT,
                price INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_contracts_branch ON contracts(branch);
            CREATE INDEX IF NOT EXISTS idx_contract_payments_contract ON contract_payments(contract_id);
            ",
        )?;
        // sold or withdrawn stock is archived, never deleted
        ensure_column(
            conn,
            "vehicles",
            "archived",
            "ALTER TABLE vehicles ADD COLUMN archived INTEGER NOT NULL DEFAULT 0",
        )?;
        Ok(())
    }
}

fn ensure_column(
    conn: &mut Connection,
    table: &str,
    column: &str,
    alter_sql: &str,
) -> Result<(), AppError> {
    let pragma = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&pragma)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(());
        }
    }
    conn.execute(alter_sql, [])?;
    log::info!("added column {table}.{column}");
    Ok(())
}

fn parse_text<T>(
    row: &Row<'_>,
    idx: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unexpected value {raw:?}").into(),
        )
    })
}

fn validate_vehicle(vehicle: &VehicleSpec) -> Result<(), AppError> {
    if vehicle.model.trim().is_empty() {
        return Err(AppError::Validation("Vehicle model is required".into()));
    }
    Ok(())
}

pub fn create_contract(conn: &Connection, form: &ContractForm) -> Result<i64, AppError> {
    if form.customer.lastname.trim().is_empty() {
        return Err(AppError::Validation("Customer last name is required".into()));
    }
    if form.customer.phone.trim().is_empty() {
        return Err(AppError::Validation("Customer phone is required".into()));
    }
    if form.amount <= 0 {
        return Err(AppError::Validation("Contract amount must be greater than zero".into()));
    }
    if form.installment <= 0 {
        return Err(AppError::Validation("Installment must be greater than zero".into()));
    }
    validate_vehicle(&form.vehicle)?;

    let ts = now_iso();
    let status = form.status.unwrap_or(ContractStatus::Pending);
    conn.execute(
        "INSERT INTO contracts (
            branch, customer_firstname, customer_othername, customer_lastname, customer_phone,
            vehicle_type, vehicle_model, vehicle_year, vehicle_color, vehicle_vin,
            amount, installment, status, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            form.branch.as_str(),
            form.customer.firstname.trim(),
            form.customer.othername.as_deref(),
            form.customer.lastname.trim(),
            form.customer.phone.trim(),
            form.vehicle.kind.as_str(),
            form.vehicle.model.trim(),
            form.vehicle.year.as_deref(),
            form.vehicle.color.as_deref(),
            form.vehicle.vin.as_deref(),
            form.amount,
            form.installment,
            status.as_str(),
            ts,
            ts
        ],
    )?;
    let id = conn.last_insert_rowid();
    log::info!("created contract {id} at {}", form.branch.as_str());
    Ok(id)
}

pub fn update_contract_status(
    conn: &Connection,
    contract_id: i64,
    status: ContractStatus,
) -> Result<(), AppError> {
    let changed = conn.execute(
        "UPDATE contracts SET status = ?, updated_at = ? WHERE id = ?",
        params![status.as_str(), now_iso(), contract_id],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("contract {contract_id}")));
    }
    Ok(())
}

const CONTRACT_COLUMNS: &str = "id, branch, customer_firstname, customer_othername,
    customer_lastname, customer_phone, vehicle_type, vehicle_model, vehicle_year,
    vehicle_color, vehicle_vin, amount, installment, status, created_at, updated_at";

fn contract_from_row(row: &Row<'_>) -> rusqlite::Result<Contract> {
    Ok(Contract {
        id: row.get(0)?,
        branch: parse_text(row, 1, Branch::from_db)?,
        customer: Customer {
            firstname: row.get(2)?,
            othername: row.get(3)?,
            lastname: row.get(4)?,
            phone: row.get(5)?,
        },
        vehicle: VehicleSpec {
            kind: parse_text(row, 6, VehicleType::from_db)?,
            model: row.get(7)?,
            year: row.get(8)?,
            color: row.get(9)?,
            vin: row.get(10)?,
        },
        amount: row.get(11)?,
        installment: row.get(12)?,
        status: parse_text(row, 13, ContractStatus::from_db)?,
        payments: Vec::new(),
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        week: row.get(0)?,
        amount: row.get(1)?,
        method: parse_text(row, 2, PaymentMethod::from_db)?,
        status: parse_text(row, 3, PaymentStatus::from_db)?,
        recorded_at: row.get(4)?,
    })
}

/// Loads one contract with its payments in insertion order.
pub fn fetch_contract(conn: &Connection, contract_id: i64) -> Result<Contract, AppError> {
    let sql = format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = ?");
    let mut contract = conn
        .query_row(&sql, params![contract_id], contract_from_row)
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("contract {contract_id}")))?;

    let mut stmt = conn.prepare(
        "SELECT week, amount, method, status, recorded_at
         FROM contract_payments
         WHERE contract_id = ?
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![contract_id], payment_from_row)?;
    for row in rows {
        contract.payments.push(row?);
    }
    Ok(contract)
}

/// Newest contracts first, each with its full payment history.
pub fn fetch_contracts(conn: &Connection) -> Result<Vec<Contract>, AppError> {
    let sql = format!("SELECT {CONTRACT_COLUMNS} FROM contracts ORDER BY created_at DESC, id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], contract_from_row)?;
    let mut contracts = Vec::new();
    for row in rows {
        contracts.push(row?);
    }

    let mut stmt = conn.prepare(
        "SELECT contract_id, week, amount, method, status, recorded_at
         FROM contract_payments
         ORDER BY contract_id, id ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        let contract_id: i64 = row.get(0)?;
        Ok((
            contract_id,
            Payment {
                week: row.get(1)?,
                amount: row.get(2)?,
                method: parse_text(row, 3, PaymentMethod::from_db)?,
                status: parse_text(row, 4, PaymentStatus::from_db)?,
                recorded_at: row.get(5)?,
            },
        ))
    })?;

    let mut by_contract: HashMap<i64, Vec<Payment>> = HashMap::new();
    for row in rows {
        let (contract_id, payment) = row?;
        by_contract.entry(contract_id).or_default().push(payment);
    }
    for contract in &mut contracts {
        if let Some(payments) = by_contract.remove(&contract.id) {
            contract.payments = payments;
        }
    }
    Ok(contracts)
}

pub fn create_vehicle(conn: &Connection, form: &VehicleForm) -> Result<i64, AppError> {
    validate_vehicle(&form.vehicle)?;
    if form.price < 0 {
        return Err(AppError::Validation("Price must not be negative".into()));
    }
    let ts = now_iso();
    conn.execute(
        "INSERT INTO vehicles (
            branch, vehicle_type, vehicle_model, vehicle_year, vehicle_color, vehicle_vin,
            price, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            form.branch.as_str(),
            form.vehicle.kind.as_str(),
            form.vehicle.model.trim(),
            form.vehicle.year.as_deref(),
            form.vehicle.color.as_deref(),
            form.vehicle.vin.as_deref(),
            form.price,
            ts,
            ts
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn archive_vehicle(conn: &Connection, vehicle_id: i64) -> Result<(), AppError> {
    let changed = conn.execute(
        "UPDATE vehicles SET archived = 1, updated_at = ? WHERE id = ?",
        params![now_iso(), vehicle_id],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("vehicle {vehicle_id}")));
    }
    Ok(())
}

pub fn fetch_vehicles(conn: &Connection) -> Result<Vec<Vehicle>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, branch, vehicle_type, vehicle_model, vehicle_year, vehicle_color,
                vehicle_vin, price, created_at, updated_at
         FROM vehicles
         WHERE archived = 0
         ORDER BY vehicle_model COLLATE NOCASE, id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Vehicle {
            id: row.get(0)?,
            branch: parse_text(row, 1, Branch::from_db)?,
            vehicle: VehicleSpec {
                kind: parse_text(row, 2, VehicleType::from_db)?,
                model: row.get(3)?,
                year: row.get(4)?,
                color: row.get(5)?,
                vin: row.get(6)?,
            },
            price: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    })?;

    let mut vehicles = Vec::new();
    for row in rows {
        vehicles.push(row?);
    }
    Ok(vehicles)
}

/// Appends payment rows to `contract_payments`. Each row commits on its own;
/// there is no transaction spanning a batch.
pub struct SqlitePaymentRecorder<'c> {
    conn: &'c Connection,
}

impl<'c> SqlitePaymentRecorder<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl PaymentRecorder for SqlitePaymentRecorder<'_> {
    fn record_payment(
        &mut self,
        contract_id: i64,
        entry: &PaymentEntry,
    ) -> Result<bool, AppError> {
        // dropped without commit on any error, so updated_at stays put
        let tx = self.conn.unchecked_transaction()?;
        let touched = tx.execute(
            "UPDATE contracts SET updated_at = ? WHERE id = ?",
            params![entry.recorded_at, contract_id],
        )?;
        if touched == 0 {
            return Ok(false);
        }
        tx.execute(
            "INSERT INTO contract_payments (contract_id, week, amount, method, status, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                contract_id,
                entry.week,
                entry.amount,
                entry.method.as_str(),
                entry.status.as_str(),
                entry.recorded_at
            ],
        )?;
        tx.commit()?;
        Ok(true)
    }
}
