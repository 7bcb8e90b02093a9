pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod state;
pub mod views;

pub mod crypto {
    pub mod token;
}

pub mod models {
    pub mod page;
    pub mod post;
    pub mod session;
    pub mod user;
}

pub mod repositories {
    pub mod post;
    pub mod user;
}

pub mod services {
    pub mod auth;
    pub mod identity;
    pub mod route_gate;
    pub mod session;
}

pub mod handlers {
    pub mod admin;
    pub mod auth;
    pub mod pages;
}

pub mod middleware_layer {
    pub mod gate;
}

pub mod validation {
    pub mod auth;
}
