macro_rules! v1_path {
    ($path:literal) => {
        concat!("/api/v1", $path)
    };
}

/// Versioned API route definitions shared by the server and its clients
pub mod v1 {
    pub const ROOT: &str = "/api/v1";
    pub const VERSION: &str = "v1";

    pub const HEALTH: &str = v1_path!("/health");

    pub mod projects {
        pub const COLLECTION: &str = v1_path!("/projects");
        pub const ITEM: &str = v1_path!("/projects/{id}");
        pub const AUDITS: &str = v1_path!("/projects/{id}/audits");
    }

    pub mod audits {
        pub const ITEM: &str = v1_path!("/audits/{id}");
        pub const STATUS: &str = v1_path!("/audits/{id}/status");
        pub const CONFIRM_AUTH: &str = v1_path!("/audits/{id}/confirm-auth");
    }
}

/// Substitute the `{id}` placeholder of a route template.
pub fn with_id(template: &str, id: impl std::fmt::Display) -> String {
    template.replacen("{id}", &id.to_string(), 1)
}
