use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use tauri::{AppHandle, Emitter, Manager, Runtime, State};

use crate::config::LedgerConfig;
use crate::db::{self, DbState, SqlitePaymentRecorder};
use crate::input::PaymentForm;
use crate::ledger::{self, SubmissionReport};
use crate::model::{Contract, ContractForm, ContractStatus, Vehicle, VehicleForm};
use crate::statement;
use crate::AppError;

type CommandResult<T> = Result<T, String>;

/// Event carrying the reloaded contract list after payments were recorded.
pub const CONTRACTS_REFRESHED: &str = "contracts-refreshed";
const CONFIG_FILE: &str = "ledger.json";

/// Wires the ledger state, plugins and commands into a Tauri builder.
pub fn register<R: Runtime>(builder: tauri::Builder<R>) -> tauri::Builder<R> {
    builder
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let state = initialize_state(app.handle())?;
            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            get_contracts,
            create_contract,
            update_contract_status,
            add_contract_payment,
            get_vehicles,
            create_vehicle,
            delete_vehicle,
            export_contract_statement
        ])
}

fn initialize_state<R: Runtime>(app: &AppHandle<R>) -> Result<DbState, AppError> {
    let paths = app.path();
    let config_path = paths
        .app_config_dir()
        .map_err(|e| AppError::Config(format!("failed to resolve app config directory: {e}")))?
        .join(CONFIG_FILE);
    let config = LedgerConfig::load(&config_path)?.with_env_overrides();
    let data_dir = paths
        .app_local_data_dir()
        .map_err(|e| AppError::Config(format!("failed to resolve app data directory: {e}")))?;
    DbState::initialize(&config.db_path(&data_dir))
}

fn load_contracts(state: &DbState) -> Result<Vec<Contract>, AppError> {
    let conn = state.open()?;
    db::fetch_contracts(&conn)
}

#[tauri::command]
fn get_contracts(state: State<DbState>) -> CommandResult<Vec<Contract>> {
    load_contracts(&state).map_err(Into::into)
}

#[tauri::command]
fn create_contract(state: State<DbState>, payload: ContractForm) -> CommandResult<Vec<Contract>> {
    let conn = state.open()?;
    db::create_contract(&conn, &payload)?;
    load_contracts(&state).map_err(Into::into)
}

#[derive(Debug, Deserialize)]
struct ContractStatusPayload {
    contract_id: i64,
    status: ContractStatus,
}

#[tauri::command]
fn update_contract_status(
    state: State<DbState>,
    payload: ContractStatusPayload,
) -> CommandResult<Vec<Contract>> {
    let conn = state.open()?;
    db::update_contract_status(&conn, payload.contract_id, payload.status)?;
    load_contracts(&state).map_err(Into::into)
}

#[derive(Debug, Deserialize)]
struct ContractPaymentPayload {
    contract_id: i64,
    amount: String,
    method: String,
}

#[tauri::command]
fn add_contract_payment<R: Runtime>(
    app: AppHandle<R>,
    state: State<DbState>,
    payload: ContractPaymentPayload,
) -> CommandResult<SubmissionReport> {
    let conn = state.open()?;
    let contract = db::fetch_contract(&conn, payload.contract_id)?;
    let form = PaymentForm {
        amount: payload.amount,
        method: payload.method,
    };

    let mut recorder = SqlitePaymentRecorder::new(&conn);
    let mut refresher = || -> Result<(), AppError> {
        let contracts = db::fetch_contracts(&conn)?;
        app.emit(CONTRACTS_REFRESHED, &contracts)
            .map_err(|e| AppError::Desktop(format!("failed to emit refresh: {e}")))
    };
    Ok(ledger::submit_payment(
        &contract,
        &form,
        &mut recorder,
        &mut refresher,
    ))
}

#[tauri::command]
fn get_vehicles(state: State<DbState>) -> CommandResult<Vec<Vehicle>> {
    let conn = state.open()?;
    db::fetch_vehicles(&conn).map_err(Into::into)
}

#[tauri::command]
fn create_vehicle(state: State<DbState>, payload: VehicleForm) -> CommandResult<Vec<Vehicle>> {
    let conn = state.open()?;
    db::create_vehicle(&conn, &payload)?;
    db::fetch_vehicles(&conn).map_err(Into::into)
}

#[tauri::command]
fn delete_vehicle(state: State<DbState>, vehicle_id: i64) -> CommandResult<Vec<Vehicle>> {
    let conn = state.open()?;
    // Soft delete: archive the vehicle so contract history stays readable
    db::archive_vehicle(&conn, vehicle_id)?;
    db::fetch_vehicles(&conn).map_err(Into::into)
}

#[tauri::command]
fn export_contract_statement<R: Runtime>(
    app: AppHandle<R>,
    state: State<DbState>,
    contract_id: i64,
) -> CommandResult<String> {
    let conn = state.open()?;
    let contract = db::fetch_contract(&conn, contract_id)?;
    let content = statement::contract_statement_csv(&contract);

    // Desktop first, app local data dir when the desktop is unavailable
    let mut target: PathBuf = match app.path().desktop_dir() {
        Ok(dir) => dir,
        Err(_) => app
            .path()
            .app_local_data_dir()
            .map_err(|e| AppError::Config(format!("failed to resolve app data dir: {e}")))?,
    };
    target.push(statement::statement_file_name(contract_id));

    fs::write(&target, content).map_err(AppError::Io)?;
    log::info!("exported statement for contract {contract_id} to {}", target.display());

    Ok(target
        .to_str()
        .map(|s| s.to_string())
        .unwrap_or_else(|| String::from("saved")))
}
