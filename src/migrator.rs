use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_catalog_tables::Migration),
            Box::new(m20240101_000002_create_supplier_tables::Migration),
            Box::new(m20240101_000003_create_routes_table::Migration),
            Box::new(m20240101_000004_create_purchase_tables::Migration),
            Box::new(m20240101_000005_create_pick_tables::Migration),
            Box::new(m20240101_000006_create_payment_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::PhotoUrl).string().not_null())
                        .col(
                            ColumnDef::new(Products::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PriceTiers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PriceTiers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PriceTiers::ProductId).uuid().not_null())
                        .col(ColumnDef::new(PriceTiers::Tier).string().not_null())
                        .col(
                            ColumnDef::new(PriceTiers::Value)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PriceTiers::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(PriceTiers::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(PriceTiers::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_price_tiers_product_tier")
                        .table(PriceTiers::Table)
                        .col(PriceTiers::ProductId)
                        .col(PriceTiers::Tier)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockRecords::ProductId)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockRecords::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockRecords::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockRecords::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockRecords::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PriceTiers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Products {
        Table,
        Id,
        Name,
        PhotoUrl,
        IsDeleted,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum PriceTiers {
        Table,
        Id,
        ProductId,
        Tier,
        Value,
        IsDeleted,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum StockRecords {
        Table,
        ProductId,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_supplier_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_supplier_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Suppliers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Suppliers::Company).string().not_null())
                        .col(ColumnDef::new(Suppliers::ContactName).string().not_null())
                        .col(ColumnDef::new(Suppliers::Address).string().not_null())
                        .col(ColumnDef::new(Suppliers::Phone).string().not_null())
                        .col(
                            ColumnDef::new(Suppliers::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Suppliers::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Suppliers::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SupplierSupplies::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SupplierSupplies::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierSupplies::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierSupplies::SupplierId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierSupplies::Amount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SupplierSupplies::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SupplierSupplies::SuppliedOn)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierSupplies::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierSupplies::UpdatedAt)
                                .timestamp()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_supplier_supplies_supplier_id")
                        .table(SupplierSupplies::Table)
                        .col(SupplierSupplies::SupplierId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SupplierSupplies::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Suppliers {
        Table,
        Id,
        Company,
        ContactName,
        Address,
        Phone,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum SupplierSupplies {
        Table,
        Id,
        ProductId,
        SupplierId,
        Amount,
        Quantity,
        SuppliedOn,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_routes_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_routes_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Routes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Routes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Routes::Name).string().not_null())
                        .col(ColumnDef::new(Routes::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Routes::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Routes::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Routes {
        Table,
        Id,
        Name,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_purchase_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_purchase_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::SupplierId).uuid().not_null())
                        .col(ColumnDef::new(PurchaseOrders::OrderedOn).date().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::Total)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseLineItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseLineItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseLineItems::PurchaseOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseLineItems::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseLineItems::Amount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PurchaseLineItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_line_items_order_id")
                        .table(PurchaseLineItems::Table)
                        .col(PurchaseLineItems::PurchaseOrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PurchaseLineItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum PurchaseOrders {
        Table,
        Id,
        SupplierId,
        OrderedOn,
        Total,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum PurchaseLineItems {
        Table,
        Id,
        PurchaseOrderId,
        ProductId,
        Amount,
        Quantity,
    }
}

mod m20240101_000005_create_pick_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_pick_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PickTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PickTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PickTransactions::UserId).uuid().not_null())
                        .col(ColumnDef::new(PickTransactions::RouteId).uuid().not_null())
                        .col(ColumnDef::new(PickTransactions::PickedOn).date().not_null())
                        .col(
                            ColumnDef::new(PickTransactions::Total)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PickTransactions::IsConfirmed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(PickTransactions::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PickTransactions::UpdatedAt)
                                .timestamp()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_pick_transactions_user_id")
                        .table(PickTransactions::Table)
                        .col(PickTransactions::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PickLineItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PickLineItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PickLineItems::TransactionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PickLineItems::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(PickLineItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PickLineItems::UnitPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PickLineItems::Subtotal).decimal().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_pick_line_items_transaction_id")
                        .table(PickLineItems::Table)
                        .col(PickLineItems::TransactionId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PickLineItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PickTransactions::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum PickTransactions {
        Table,
        Id,
        UserId,
        RouteId,
        PickedOn,
        Total,
        IsConfirmed,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum PickLineItems {
        Table,
        Id,
        TransactionId,
        ProductId,
        Quantity,
        UnitPrice,
        Subtotal,
    }
}

mod m20240101_000006_create_payment_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_payment_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PaymentTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentTransactions::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(PaymentTransactions::RouteId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentTransactions::PaidOn).date().not_null())
                        .col(
                            ColumnDef::new(PaymentTransactions::TotalDue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::AmountPaid)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::Shortfall)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(PaymentTransactions::Status).string().not_null())
                        .col(
                            ColumnDef::new(PaymentTransactions::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::UpdatedAt)
                                .timestamp()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Upsert key used when a pick edit re-syncs its ledger entry
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_transactions_user_route_date")
                        .table(PaymentTransactions::Table)
                        .col(PaymentTransactions::UserId)
                        .col(PaymentTransactions::RouteId)
                        .col(PaymentTransactions::PaidOn)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PaymentLineItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentLineItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentLineItems::PaymentId).uuid().not_null())
                        .col(
                            ColumnDef::new(PaymentLineItems::PickLineItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentLineItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentLineItems::UnitPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentLineItems::Subtotal)
                                .decimal()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_line_items_payment_id")
                        .table(PaymentLineItems::Table)
                        .col(PaymentLineItems::PaymentId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PaymentLineItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PaymentTransactions::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum PaymentTransactions {
        Table,
        Id,
        UserId,
        RouteId,
        PaidOn,
        TotalDue,
        AmountPaid,
        Shortfall,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum PaymentLineItems {
        Table,
        Id,
        PaymentId,
        PickLineItemId,
        Quantity,
        UnitPrice,
        Subtotal,
    }
}
