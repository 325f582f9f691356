use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_quotes_tables::Migration),
            Box::new(m20260101_000002_create_vendor_request_tables::Migration),
            Box::new(m20260101_000003_create_budget_tables::Migration),
            Box::new(m20260101_000004_create_orders_tables::Migration),
            Box::new(m20260101_000005_create_inventory_items_table::Migration),
        ]
    }
}

mod m20260101_000001_create_quotes_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_quotes_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Quotes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Quotes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Quotes::UserId).uuid().not_null())
                        .col(ColumnDef::new(Quotes::OrganizationId).uuid())
                        .col(ColumnDef::new(Quotes::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Quotes::TotalAmount).big_integer())
                        .col(ColumnDef::new(Quotes::Currency).string_len(8).not_null())
                        .col(ColumnDef::new(Quotes::Message).text())
                        .col(
                            ColumnDef::new(Quotes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Quotes::UpdatedAt).timestamp_with_time_zone())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_quotes_user_id")
                        .table(Quotes::Table)
                        .col(Quotes::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(QuoteItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(QuoteItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(QuoteItems::QuoteId).uuid().not_null())
                        .col(ColumnDef::new(QuoteItems::LineNumber).integer().not_null())
                        .col(ColumnDef::new(QuoteItems::ProductId).uuid())
                        .col(ColumnDef::new(QuoteItems::ProductName).string().not_null())
                        .col(ColumnDef::new(QuoteItems::Brand).string())
                        .col(ColumnDef::new(QuoteItems::CatalogNumber).string())
                        .col(ColumnDef::new(QuoteItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(QuoteItems::Unit).string_len(16).not_null())
                        .col(ColumnDef::new(QuoteItems::UnitPrice).big_integer())
                        .col(ColumnDef::new(QuoteItems::LineTotal).big_integer())
                        .col(ColumnDef::new(QuoteItems::PackSize).string())
                        .col(ColumnDef::new(QuoteItems::Notes).text())
                        .col(
                            ColumnDef::new(QuoteItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_quote_items_quote_id")
                                .from(QuoteItems::Table, QuoteItems::QuoteId)
                                .to(Quotes::Table, Quotes::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_quote_items_quote_id")
                        .table(QuoteItems::Table)
                        .col(QuoteItems::QuoteId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(QuoteItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Quotes::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Quotes {
        Table,
        Id,
        UserId,
        OrganizationId,
        Status,
        TotalAmount,
        Currency,
        Message,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum QuoteItems {
        Table,
        Id,
        QuoteId,
        LineNumber,
        ProductId,
        ProductName,
        Brand,
        CatalogNumber,
        Quantity,
        Unit,
        UnitPrice,
        LineTotal,
        PackSize,
        Notes,
        CreatedAt,
    }
}

mod m20260101_000002_create_vendor_request_tables {
    use sea_orm_migration::prelude::*;

    use super::m20260101_000001_create_quotes_tables::Quotes;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_vendor_request_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(VendorRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(VendorRequests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(VendorRequests::QuoteId).uuid().not_null())
                        .col(
                            ColumnDef::new(VendorRequests::VendorName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(VendorRequests::VendorEmail)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(VendorRequests::Token).string().not_null())
                        .col(
                            ColumnDef::new(VendorRequests::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(VendorRequests::ExpiresAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(VendorRequests::Snapshot).json().not_null())
                        .col(
                            ColumnDef::new(VendorRequests::ResponseEditCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(VendorRequests::ResponseEditLimit)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(VendorRequests::RespondedAt)
                                .timestamp_with_time_zone(),
                        )
                        .col(
                            ColumnDef::new(VendorRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(VendorRequests::UpdatedAt)
                                .timestamp_with_time_zone(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_vendor_requests_quote_id")
                                .from(VendorRequests::Table, VendorRequests::QuoteId)
                                .to(Quotes::Table, Quotes::Id),
                        )
                        .to_owned(),
                )
                .await?;

            // The token is the only lookup key on the public endpoint.
            manager
                .create_index(
                    Index::create()
                        .name("idx_vendor_requests_token")
                        .table(VendorRequests::Table)
                        .col(VendorRequests::Token)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_vendor_requests_quote_id")
                        .table(VendorRequests::Table)
                        .col(VendorRequests::QuoteId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(VendorResponseItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(VendorResponseItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(VendorResponseItems::VendorRequestId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(VendorResponseItems::SnapshotItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(VendorResponseItems::UnitPrice)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(VendorResponseItems::Currency)
                                .string_len(8)
                                .not_null(),
                        )
                        .col(ColumnDef::new(VendorResponseItems::LeadTimeDays).integer())
                        .col(ColumnDef::new(VendorResponseItems::MinimumOrderQuantity).integer())
                        .col(ColumnDef::new(VendorResponseItems::VendorSku).string())
                        .col(ColumnDef::new(VendorResponseItems::Notes).text())
                        .col(
                            ColumnDef::new(VendorResponseItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(VendorResponseItems::UpdatedAt)
                                .timestamp_with_time_zone(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_vendor_response_items_request_id")
                                .from(
                                    VendorResponseItems::Table,
                                    VendorResponseItems::VendorRequestId,
                                )
                                .to(VendorRequests::Table, VendorRequests::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_vendor_response_items_request_line")
                        .table(VendorResponseItems::Table)
                        .col(VendorResponseItems::VendorRequestId)
                        .col(VendorResponseItems::SnapshotItemId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(VendorResponseItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(VendorRequests::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum VendorRequests {
        Table,
        Id,
        QuoteId,
        VendorName,
        VendorEmail,
        Token,
        Status,
        ExpiresAt,
        Snapshot,
        ResponseEditCount,
        ResponseEditLimit,
        RespondedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum VendorResponseItems {
        Table,
        Id,
        VendorRequestId,
        SnapshotItemId,
        UnitPrice,
        Currency,
        LeadTimeDays,
        MinimumOrderQuantity,
        VendorSku,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000003_create_budget_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_budget_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Budgets::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Budgets::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Budgets::UserId).uuid().not_null())
                        .col(ColumnDef::new(Budgets::OrganizationId).uuid())
                        .col(ColumnDef::new(Budgets::Name).string().not_null())
                        .col(
                            ColumnDef::new(Budgets::TotalAmount)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Budgets::UsedAmount).big_integer().not_null())
                        .col(
                            ColumnDef::new(Budgets::RemainingAmount)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Budgets::Currency).string_len(8).not_null())
                        .col(ColumnDef::new(Budgets::IsActive).boolean().not_null())
                        .col(ColumnDef::new(Budgets::PeriodStart).timestamp_with_time_zone())
                        .col(ColumnDef::new(Budgets::PeriodEnd).timestamp_with_time_zone())
                        .col(
                            ColumnDef::new(Budgets::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Budgets::UpdatedAt).timestamp_with_time_zone())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_budgets_user_active")
                        .table(Budgets::Table)
                        .col(Budgets::UserId)
                        .col(Budgets::IsActive)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BudgetTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BudgetTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BudgetTransactions::BudgetId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BudgetTransactions::OrderId).uuid())
                        .col(
                            ColumnDef::new(BudgetTransactions::Direction)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BudgetTransactions::Amount)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BudgetTransactions::Description)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BudgetTransactions::BalanceBefore)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BudgetTransactions::BalanceAfter)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BudgetTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_budget_transactions_budget_id")
                                .from(BudgetTransactions::Table, BudgetTransactions::BudgetId)
                                .to(Budgets::Table, Budgets::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_budget_transactions_budget_id")
                        .table(BudgetTransactions::Table)
                        .col(BudgetTransactions::BudgetId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BudgetTransactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Budgets::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Budgets {
        Table,
        Id,
        UserId,
        OrganizationId,
        Name,
        TotalAmount,
        UsedAmount,
        RemainingAmount,
        Currency,
        IsActive,
        PeriodStart,
        PeriodEnd,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum BudgetTransactions {
        Table,
        Id,
        BudgetId,
        OrderId,
        Direction,
        Amount,
        Description,
        BalanceBefore,
        BalanceAfter,
        CreatedAt,
    }
}

mod m20260101_000004_create_orders_tables {
    use sea_orm_migration::prelude::*;

    use super::m20260101_000001_create_quotes_tables::Quotes;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000004_create_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                        .col(ColumnDef::new(Orders::QuoteId).uuid().not_null())
                        .col(ColumnDef::new(Orders::OrganizationId).uuid())
                        .col(ColumnDef::new(Orders::OrderNumber).string().not_null())
                        .col(ColumnDef::new(Orders::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Orders::TotalAmount).big_integer().not_null())
                        .col(ColumnDef::new(Orders::Currency).string_len(8).not_null())
                        .col(ColumnDef::new(Orders::ShippingAddress).text())
                        .col(ColumnDef::new(Orders::Notes).text())
                        .col(
                            ColumnDef::new(Orders::ActualDeliveryDate)
                                .timestamp_with_time_zone(),
                        )
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp_with_time_zone())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_quote_id")
                                .from(Orders::Table, Orders::QuoteId)
                                .to(Quotes::Table, Quotes::Id),
                        )
                        .to_owned(),
                )
                .await?;

            // One order per quote, enforced even under concurrent conversion.
            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_quote_id")
                        .table(Orders::Table)
                        .col(Orders::QuoteId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_user_id")
                        .table(Orders::Table)
                        .col(Orders::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::LineNumber).integer().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid())
                        .col(ColumnDef::new(OrderItems::ProductName).string().not_null())
                        .col(ColumnDef::new(OrderItems::Brand).string())
                        .col(ColumnDef::new(OrderItems::CatalogNumber).string())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(OrderItems::Unit).string_len(16).not_null())
                        .col(ColumnDef::new(OrderItems::UnitPrice).big_integer())
                        .col(ColumnDef::new(OrderItems::LineTotal).big_integer())
                        .col(
                            ColumnDef::new(OrderItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Orders {
        Table,
        Id,
        UserId,
        QuoteId,
        OrganizationId,
        OrderNumber,
        Status,
        TotalAmount,
        Currency,
        ShippingAddress,
        Notes,
        ActualDeliveryDate,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        LineNumber,
        ProductId,
        ProductName,
        Brand,
        CatalogNumber,
        Quantity,
        Unit,
        UnitPrice,
        LineTotal,
        CreatedAt,
    }
}

mod m20260101_000005_create_inventory_items_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000005_create_inventory_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::UserId).uuid().not_null())
                        .col(ColumnDef::new(InventoryItems::OrderItemId).uuid())
                        .col(
                            ColumnDef::new(InventoryItems::ProductName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::Unit)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::Location).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::ReceivedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_inventory_items_user_id")
                        .table(InventoryItems::Table)
                        .col(InventoryItems::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum InventoryItems {
        Table,
        Id,
        UserId,
        OrderItemId,
        ProductName,
        Quantity,
        Unit,
        Location,
        Status,
        ReceivedAt,
        CreatedAt,
    }
}
