#![allow(dead_code)]

use std::sync::Arc;

use asset_ledger::entities::{device, device_model, LocationRef, TransactionType};
use asset_ledger::movements::{LineItemRequest, ProcurementLineRequest};
use asset_ledger::services::ledger::TransactionRecord;
use asset_ledger::services::locations::LocationDirectory;
use asset_ledger::services::registry::DeviceRegistry;
use asset_ledger::{
    config::AppConfig,
    db::{self, DbPool},
    events::{self, Event},
    MovementRequest, MovementService, ProcurementRequest, ServiceError,
};
use tokio::sync::mpsc;

/// Reference data every scenario starts from.
///
/// Site A holds the main warehouse, a repair depot and two floors. Site B
/// holds the annex warehouse and one floor.
pub struct World {
    pub site_a: i64,
    pub site_b: i64,
    pub main: LocationRef,
    pub depot: LocationRef,
    pub annex: LocationRef,
    pub floor_1: LocationRef,
    pub floor_2: LocationRef,
    pub floor_b: LocationRef,
    pub admin: i64,
    pub alice: LocationRef,
    pub bob: LocationRef,
    pub laptop: device_model::Model,
    pub cable: device_model::Model,
}

/// Movement service backed by a fresh in-memory SQLite database.
pub struct TestLedger {
    pub service: MovementService,
    pub db: Arc<DbPool>,
    pub events: mpsc::Receiver<Event>,
    pub world: World,
}

impl TestLedger {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.default_page_size = 5;
        cfg.max_page_size = 10;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("connect and migrate in-memory database");
        let db = Arc::new(pool);
        let (sender, events) = events::channel(cfg.event_channel_capacity);
        let service = MovementService::from_config(db.clone(), Arc::new(sender), &cfg);

        let world = seed(&db).await;

        Self {
            service,
            db,
            events,
            world,
        }
    }

    pub fn admin(&self) -> i64 {
        self.world.admin
    }

    pub async fn receive_serials(
        &self,
        warehouse: LocationRef,
        serials: &[&str],
    ) -> Vec<device::Model> {
        let lines = serials
            .iter()
            .map(|s| ProcurementLineRequest::serial(self.world.laptop.id, *s))
            .collect();
        self.service
            .receive_procurement(self.admin(), ProcurementRequest::new(warehouse.id, lines))
            .await
            .expect("receive serialized devices")
            .created_devices
    }

    pub async fn receive_cables(&self, warehouse: LocationRef, quantity: i32) {
        let lines = vec![ProcurementLineRequest::bulk(self.world.cable.id, quantity)];
        self.service
            .receive_procurement(self.admin(), ProcurementRequest::new(warehouse.id, lines))
            .await
            .expect("receive bulk devices");
    }

    pub async fn record(
        &self,
        transaction_type: TransactionType,
        source: Option<LocationRef>,
        destination: Option<LocationRef>,
        lines: Vec<LineItemRequest>,
    ) -> Result<TransactionRecord, ServiceError> {
        self.service
            .record_movement(
                self.admin(),
                MovementRequest::new(transaction_type, source, destination, lines),
            )
            .await
    }

    pub fn cables(&self, quantity: i32) -> LineItemRequest {
        LineItemRequest::bulk(self.world.cable.id, quantity)
    }

    pub async fn cables_at(&self, location: LocationRef) -> i32 {
        self.service
            .stock_level(self.world.cable.id, location)
            .await
            .expect("read stock level")
    }

    pub async fn device(&self, serial: &str) -> device::Model {
        DeviceRegistry::find_by_serial(self.db.as_ref(), serial)
            .await
            .expect("look up device")
            .expect("device exists")
    }

    pub async fn transaction_count(&self) -> u64 {
        self.service
            .list_transactions(Default::default(), 1, None)
            .await
            .expect("list transactions")
            .total
    }

    /// Drains everything published so far.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

async fn seed(db: &DbPool) -> World {
    let site_a = LocationDirectory::create_site(db, "Headquarters")
        .await
        .expect("site a");
    let site_b = LocationDirectory::create_site(db, "Branch")
        .await
        .expect("site b");

    let main = LocationDirectory::create_warehouse(db, site_a.id, "HQ store", false)
        .await
        .expect("main warehouse");
    let depot = LocationDirectory::create_warehouse(db, site_a.id, "HQ repair", true)
        .await
        .expect("repair depot");
    let annex = LocationDirectory::create_warehouse(db, site_b.id, "Branch store", false)
        .await
        .expect("annex warehouse");

    let floor_1 = LocationDirectory::create_floor(db, site_a.id, "HQ 1st floor")
        .await
        .expect("floor 1");
    let floor_2 = LocationDirectory::create_floor(db, site_a.id, "HQ 2nd floor")
        .await
        .expect("floor 2");
    let floor_b = LocationDirectory::create_floor(db, site_b.id, "Branch ground floor")
        .await
        .expect("floor b");

    let admin = LocationDirectory::create_employee(db, "Store Admin", "admin@example.com")
        .await
        .expect("admin");
    let alice = LocationDirectory::create_employee(db, "Alice", "alice@example.com")
        .await
        .expect("alice");
    let bob = LocationDirectory::create_employee(db, "Bob", "bob@example.com")
        .await
        .expect("bob");

    let laptop = DeviceRegistry::create_model(db, "ThinkPad T14", Some("Lenovo"), true)
        .await
        .expect("laptop model");
    let cable = DeviceRegistry::create_model(db, "USB-C cable", None, false)
        .await
        .expect("cable model");

    World {
        site_a: site_a.id,
        site_b: site_b.id,
        main: LocationRef::warehouse(main.id),
        depot: LocationRef::warehouse(depot.id),
        annex: LocationRef::warehouse(annex.id),
        floor_1: LocationRef::floor(floor_1.id),
        floor_2: LocationRef::floor(floor_2.id),
        floor_b: LocationRef::floor(floor_b.id),
        admin: admin.id,
        alice: LocationRef::user(alice.id),
        bob: LocationRef::user(bob.id),
        laptop,
        cable,
    }
}
