//! One repository per resource, behind trait objects so the API runs the same
//! code against Postgres and in-memory storage.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::{Mutex, OwnedMutexGuard};

use salonbook_appointments::Appointment;
use salonbook_catalog::ServiceItem;
use salonbook_core::{OwnerId, RecordId};
use salonbook_customers::Customer;
use salonbook_finance::FinanceTransaction;
use salonbook_inventory::{StockItem, StockMovement};
use salonbook_loyalty::{PointsEntry, Voucher};
use salonbook_settings::BusinessSettings;
use salonbook_staff::{AttendanceRecord, PayrollRecord, StaffMember};

use crate::accounts::{AccountStore, InMemoryAccountStore, PgAccountStore};
use crate::repository::postgres::{PgBackend, SharedTransaction, map_sqlx_error};
use crate::repository::{InMemoryRepository, PgRepository, Repository, RepositoryError};

/// How [`Stores::begin`] groups writes.
#[derive(Clone)]
enum Units {
    /// In memory: one unit of work at a time.
    Serialized(Arc<Mutex<()>>),
    /// One Postgres transaction per unit of work.
    Postgres(Arc<PgPool>),
    /// Already inside a unit of work; nested ones join it.
    Joined,
}

#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub customers: Arc<dyn Repository<Customer>>,
    pub services: Arc<dyn Repository<ServiceItem>>,
    pub appointments: Arc<dyn Repository<Appointment>>,
    pub staff: Arc<dyn Repository<StaffMember>>,
    pub attendance: Arc<dyn Repository<AttendanceRecord>>,
    pub payroll: Arc<dyn Repository<PayrollRecord>>,
    pub inventory: Arc<dyn Repository<StockItem>>,
    pub stock_movements: Arc<dyn Repository<StockMovement>>,
    pub vouchers: Arc<dyn Repository<Voucher>>,
    pub points: Arc<dyn Repository<PointsEntry>>,
    pub finance: Arc<dyn Repository<FinanceTransaction>>,
    pub settings: Arc<dyn Repository<BusinessSettings>>,
    units: Units,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            accounts: Arc::new(InMemoryAccountStore::new()),
            customers: Arc::new(InMemoryRepository::new()),
            services: Arc::new(InMemoryRepository::new()),
            appointments: Arc::new(InMemoryRepository::new()),
            staff: Arc::new(InMemoryRepository::new()),
            attendance: Arc::new(InMemoryRepository::new()),
            payroll: Arc::new(InMemoryRepository::new()),
            inventory: Arc::new(InMemoryRepository::new()),
            stock_movements: Arc::new(InMemoryRepository::new()),
            vouchers: Arc::new(InMemoryRepository::new()),
            points: Arc::new(InMemoryRepository::new()),
            finance: Arc::new(InMemoryRepository::new()),
            settings: Arc::new(InMemoryRepository::new()),
            units: Units::Serialized(Arc::new(Mutex::new(()))),
        }
    }

    pub fn postgres(pool: Arc<PgPool>) -> Self {
        let mut stores = Self::on_backend(PgBackend::Pool(pool.clone()), Arc::new(PgAccountStore::new(pool.clone())));
        stores.units = Units::Postgres(pool);
        stores
    }

    fn on_backend(backend: PgBackend, accounts: Arc<dyn AccountStore>) -> Self {
        Self {
            accounts,
            customers: Arc::new(PgRepository::with_backend(backend.clone())),
            services: Arc::new(PgRepository::with_backend(backend.clone())),
            appointments: Arc::new(PgRepository::with_backend(backend.clone())),
            staff: Arc::new(PgRepository::with_backend(backend.clone())),
            attendance: Arc::new(PgRepository::with_backend(backend.clone())),
            payroll: Arc::new(PgRepository::with_backend(backend.clone())),
            inventory: Arc::new(PgRepository::with_backend(backend.clone())),
            stock_movements: Arc::new(PgRepository::with_backend(backend.clone())),
            vouchers: Arc::new(PgRepository::with_backend(backend.clone())),
            points: Arc::new(PgRepository::with_backend(backend.clone())),
            finance: Arc::new(PgRepository::with_backend(backend.clone())),
            settings: Arc::new(PgRepository::with_backend(backend)),
            units: Units::Joined,
        }
    }

    /// Start a unit of work.
    ///
    /// Against Postgres the returned stores share one transaction, rolled
    /// back unless [`StoreTx::commit`] runs. In memory, units of work run one
    /// at a time and writes land immediately.
    pub async fn begin(&self) -> Result<StoreTx, RepositoryError> {
        match &self.units {
            Units::Serialized(lock) => {
                let guard = lock.clone().lock_owned().await;
                let mut stores = self.clone();
                stores.units = Units::Joined;
                Ok(StoreTx { stores, finish: Finish::Release { _guard: guard } })
            }
            Units::Postgres(pool) => {
                let tx = pool.begin().await.map_err(|e| map_sqlx_error("begin", e))?;
                let shared: SharedTransaction = Arc::new(Mutex::new(Some(tx)));
                let stores = Self::on_backend(PgBackend::Transaction(shared.clone()), self.accounts.clone());
                Ok(StoreTx { stores, finish: Finish::Commit(shared) })
            }
            Units::Joined => Ok(StoreTx { stores: self.clone(), finish: Finish::Outer }),
        }
    }

    /// Saved settings, or the defaults when the owner never saved any.
    pub async fn settings_for(&self, owner: OwnerId) -> Result<BusinessSettings, RepositoryError> {
        let id = RecordId::singleton_for(owner);
        Ok(self
            .settings
            .get(owner, id)
            .await?
            .unwrap_or_else(|| BusinessSettings::defaults_for(owner)))
    }

    /// Insert or replace the owner's settings record.
    pub async fn save_settings(&self, settings: BusinessSettings) -> Result<BusinessSettings, RepositoryError> {
        match self.settings.get(settings.owner_id, settings.id).await? {
            Some(_) => self.settings.update(settings).await,
            None => self.settings.insert(settings).await,
        }
    }
}

enum Finish {
    Release { _guard: OwnedMutexGuard<()> },
    Commit(SharedTransaction),
    Outer,
}

/// An open unit of work from [`Stores::begin`]. Dropping it without
/// committing rolls a Postgres transaction back.
pub struct StoreTx {
    stores: Stores,
    finish: Finish,
}

impl StoreTx {
    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub async fn commit(self) -> Result<(), RepositoryError> {
        match self.finish {
            Finish::Commit(shared) => {
                let tx = shared.lock().await.take();
                match tx {
                    Some(tx) => tx.commit().await.map_err(|e| map_sqlx_error("commit", e)),
                    None => Ok(()),
                }
            }
            Finish::Release { .. } | Finish::Outer => Ok(()),
        }
    }
}
