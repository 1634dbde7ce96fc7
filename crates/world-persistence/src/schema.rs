// Esquema Diesel (SQLite) del almacenamiento de mundos.
// Tablas: documents, world_settings
diesel::table! {
    documents (kind, id) {
        kind -> Text,
        id -> Text,
        position -> BigInt,
        source -> Text,
        schema_version -> Double,
        updated_at_ts -> BigInt,
    }
}
diesel::table! {
    world_settings (key) {
        key -> Text,
        value -> Text,
    }
}
diesel::allow_tables_to_appear_in_same_query!(documents, world_settings);
