use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_directory_tables::Migration),
            Box::new(m20250301_000002_create_catalog_tables::Migration),
            Box::new(m20250301_000003_create_request_tables::Migration),
            Box::new(m20250301_000004_create_system_settings_table::Migration),
        ]
    }
}

// Migration implementations

mod m20250301_000001_create_directory_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_directory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Offices::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Offices::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Offices::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Offices::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Roles::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Roles::Id)
                                .small_integer()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Roles::Name).string().not_null().unique_key())
                        .to_owned(),
                )
                .await?;

            // Seed the closed role set; application code maps these ids onto
            // the Role enum.
            manager
                .exec_stmt(
                    Query::insert()
                        .into_table(Roles::Table)
                        .columns([Roles::Id, Roles::Name])
                        .values_panic([1i16.into(), "Admin".into()])
                        .values_panic([2i16.into(), "Office Head".into()])
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Users::Username)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::FullName).string().not_null())
                        .col(ColumnDef::new(Users::OfficeId).uuid().null())
                        .col(ColumnDef::new(Users::RoleId).small_integer().not_null())
                        .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_users_office")
                                .from(Users::Table, Users::OfficeId)
                                .to(Offices::Table, Offices::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_users_role")
                                .from(Users::Table, Users::RoleId)
                                .to(Roles::Table, Roles::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_office_id")
                        .table(Users::Table)
                        .col(Users::OfficeId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Roles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Offices::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Offices {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Roles {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Username,
        Email,
        PasswordHash,
        FullName,
        OfficeId,
        RoleId,
        CreatedAt,
    }
}

mod m20250301_000002_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ItemCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ItemCategories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ItemCategories::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(ItemCategories::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ItemCategories::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Items::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Items::Name).string().not_null().unique_key())
                        .col(ColumnDef::new(Items::Description).string().null())
                        .col(ColumnDef::new(Items::CategoryId).uuid().null())
                        .col(ColumnDef::new(Items::UnitTypes).string().not_null())
                        .col(
                            ColumnDef::new(Items::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Items::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Items::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Items::UpdatedAt).timestamp().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_items_category")
                                .from(Items::Table, Items::CategoryId)
                                .to(ItemCategories::Table, ItemCategories::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_items_category_id")
                        .table(Items::Table)
                        .col(Items::CategoryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Items::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ItemCategories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ItemCategories {
        Table,
        Id,
        Name,
        IsActive,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Items {
        Table,
        Id,
        Name,
        Description,
        CategoryId,
        UnitTypes,
        Price,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000003_create_request_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_request_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Requests::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Requests::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Requests::UserId).uuid().not_null())
                        .col(ColumnDef::new(Requests::OfficeId).uuid().not_null())
                        .col(
                            ColumnDef::new(Requests::Status)
                                .string_len(16)
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(Requests::DateRequested)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Requests::UpdatedAt).timestamp().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_requests_user")
                                .from(Requests::Table, Requests::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_requests_office")
                                .from(Requests::Table, Requests::OfficeId)
                                .to(Offices::Table, Offices::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            // Line items cascade with their parent request; catalog items are
            // protected from deletion while any line still references them.
            manager
                .create_table(
                    Table::create()
                        .table(RequestItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RequestItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RequestItems::RequestId).uuid().not_null())
                        .col(ColumnDef::new(RequestItems::ItemId).uuid().null())
                        .col(ColumnDef::new(RequestItems::CustomItemName).string().null())
                        .col(ColumnDef::new(RequestItems::UnitType).string().not_null())
                        .col(ColumnDef::new(RequestItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(RequestItems::PricePerUnit)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_request_items_request")
                                .from(RequestItems::Table, RequestItems::RequestId)
                                .to(Requests::Table, Requests::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_request_items_item")
                                .from(RequestItems::Table, RequestItems::ItemId)
                                .to(Items::Table, Items::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_requests_office_status")
                        .table(Requests::Table)
                        .col(Requests::OfficeId)
                        .col(Requests::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_request_items_request_id")
                        .table(RequestItems::Table)
                        .col(RequestItems::RequestId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_request_items_item_id")
                        .table(RequestItems::Table)
                        .col(RequestItems::ItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RequestItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Requests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Requests {
        Table,
        Id,
        UserId,
        OfficeId,
        Status,
        DateRequested,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum RequestItems {
        Table,
        Id,
        RequestId,
        ItemId,
        CustomItemName,
        UnitType,
        Quantity,
        PricePerUnit,
    }

    // FK targets created by earlier migrations.
    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Offices {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Items {
        Table,
        Id,
    }
}

mod m20250301_000004_create_system_settings_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_system_settings_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SystemSettings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SystemSettings::SettingKey)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SystemSettings::SettingValue)
                                .string()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SystemSettings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum SystemSettings {
        Table,
        SettingKey,
        SettingValue,
    }
}
