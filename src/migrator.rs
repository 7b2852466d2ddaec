use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_reference_tables::Migration),
            Box::new(m20240101_000002_create_device_tables::Migration),
            Box::new(m20240101_000003_create_stock_pool_table::Migration),
            Box::new(m20240101_000004_create_ledger_tables::Migration),
        ]
    }
}

mod m20240101_000001_create_reference_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sites::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Sites::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Sites::Name).string().not_null().unique_key())
                        .col(
                            ColumnDef::new(Sites::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Warehouses::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Warehouses::SiteId).big_integer().not_null())
                        .col(
                            ColumnDef::new(Warehouses::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Warehouses::IsRepairDepot)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Warehouses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_warehouses_site_id")
                                .from(Warehouses::Table, Warehouses::SiteId)
                                .to(Sites::Table, Sites::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Floors::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Floors::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Floors::SiteId).big_integer().not_null())
                        .col(ColumnDef::new(Floors::Name).string().not_null())
                        .col(
                            ColumnDef::new(Floors::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_floors_site_id")
                                .from(Floors::Table, Floors::SiteId)
                                .to(Sites::Table, Sites::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_floors_site_name")
                        .table(Floors::Table)
                        .col(Floors::SiteId)
                        .col(Floors::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Employees::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Employees::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Employees::Name).string().not_null())
                        .col(
                            ColumnDef::new(Employees::Email)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Employees::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Employees::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Floors::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Sites::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Sites {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Warehouses {
        Table,
        Id,
        SiteId,
        Name,
        IsRepairDepot,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Floors {
        Table,
        Id,
        SiteId,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Employees {
        Table,
        Id,
        Name,
        Email,
        CreatedAt,
    }
}

mod m20240101_000002_create_device_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_device_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DeviceModels::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeviceModels::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DeviceModels::Name).string().not_null())
                        .col(ColumnDef::new(DeviceModels::Manufacturer).string().null())
                        .col(ColumnDef::new(DeviceModels::HasSerial).boolean().not_null())
                        .col(
                            ColumnDef::new(DeviceModels::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeviceModels::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Devices::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Devices::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Devices::ModelId).big_integer().not_null())
                        .col(ColumnDef::new(Devices::SerialNumber).string().null())
                        .col(ColumnDef::new(Devices::Status).string_len(16).not_null())
                        .col(ColumnDef::new(Devices::WarehouseId).big_integer().null())
                        .col(ColumnDef::new(Devices::FloorId).big_integer().null())
                        .col(ColumnDef::new(Devices::UserId).big_integer().null())
                        .col(
                            ColumnDef::new(Devices::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Devices::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_devices_model_id")
                                .from(Devices::Table, Devices::ModelId)
                                .to(DeviceModels::Table, DeviceModels::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // NULL serials (bulk representatives) never collide
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_devices_serial_number")
                        .table(Devices::Table)
                        .col(Devices::SerialNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_devices_model_id")
                        .table(Devices::Table)
                        .col(Devices::ModelId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Devices::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DeviceModels::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum DeviceModels {
        Table,
        Id,
        Name,
        Manufacturer,
        HasSerial,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Devices {
        Table,
        Id,
        ModelId,
        SerialNumber,
        Status,
        WarehouseId,
        FloorId,
        UserId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_stock_pool_table {

    use super::m20240101_000002_create_device_tables::Devices;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_stock_pool_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(LocationStockPool::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LocationStockPool::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(LocationStockPool::DeviceId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LocationStockPool::LocationKind)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LocationStockPool::LocationId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LocationStockPool::Quantity)
                                .integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(LocationStockPool::Quantity).gte(0)),
                        )
                        .col(
                            ColumnDef::new(LocationStockPool::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(LocationStockPool::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_location_stock_pool_device_id")
                                .from(LocationStockPool::Table, LocationStockPool::DeviceId)
                                .to(Devices::Table, Devices::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_location_stock_pool_device_location")
                        .table(LocationStockPool::Table)
                        .col(LocationStockPool::DeviceId)
                        .col(LocationStockPool::LocationKind)
                        .col(LocationStockPool::LocationId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(LocationStockPool::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum LocationStockPool {
        Table,
        Id,
        DeviceId,
        LocationKind,
        LocationId,
        Quantity,
        Version,
        UpdatedAt,
    }
}

mod m20240101_000004_create_ledger_tables {

    use super::m20240101_000001_create_reference_tables::Employees;
    use super::m20240101_000002_create_device_tables::Devices;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_ledger_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AssetTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AssetTransactions::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(AssetTransactions::TransactionType)
                                .string_len(24)
                                .not_null(),
                        )
                        .col(ColumnDef::new(AssetTransactions::SourceKind).string_len(16).null())
                        .col(ColumnDef::new(AssetTransactions::SourceId).big_integer().null())
                        .col(
                            ColumnDef::new(AssetTransactions::DestinationKind)
                                .string_len(16)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AssetTransactions::DestinationId)
                                .big_integer()
                                .null(),
                        )
                        .col(ColumnDef::new(AssetTransactions::Status).string_len(16).null())
                        .col(ColumnDef::new(AssetTransactions::Note).text().null())
                        .col(
                            ColumnDef::new(AssetTransactions::CreatedBy)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AssetTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AssetTransactions::ApprovedBy).big_integer().null())
                        .col(
                            ColumnDef::new(AssetTransactions::ApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AssetTransactions::ConfirmedBy)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AssetTransactions::ConfirmedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_asset_transactions_created_by")
                                .from(AssetTransactions::Table, AssetTransactions::CreatedBy)
                                .to(Employees::Table, Employees::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_asset_transactions_type_created_at")
                        .table(AssetTransactions::Table)
                        .col(AssetTransactions::TransactionType)
                        .col(AssetTransactions::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TransactionDetails::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransactionDetails::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(TransactionDetails::TransactionId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransactionDetails::LineNo).integer().not_null())
                        .col(
                            ColumnDef::new(TransactionDetails::DeviceId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransactionDetails::Quantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(TransactionDetails::Quantity).gt(0)),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transaction_details_transaction_id")
                                .from(TransactionDetails::Table, TransactionDetails::TransactionId)
                                .to(AssetTransactions::Table, AssetTransactions::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transaction_details_device_id")
                                .from(TransactionDetails::Table, TransactionDetails::DeviceId)
                                .to(Devices::Table, Devices::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transaction_details_device_transaction")
                        .table(TransactionDetails::Table)
                        .col(TransactionDetails::DeviceId)
                        .col(TransactionDetails::TransactionId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TransactionDetails::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(AssetTransactions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum AssetTransactions {
        Table,
        Id,
        TransactionType,
        SourceKind,
        SourceId,
        DestinationKind,
        DestinationId,
        Status,
        Note,
        CreatedBy,
        CreatedAt,
        ApprovedBy,
        ApprovedAt,
        ConfirmedBy,
        ConfirmedAt,
    }

    #[derive(DeriveIden)]
    enum TransactionDetails {
        Table,
        Id,
        TransactionId,
        LineNo,
        DeviceId,
        Quantity,
    }
}
