use std::net::TcpListener;
use std::path::Path;

use apicontroller::config::Settings;
use apicontroller::controller::{Controller, SaveRequest};

/// A local URL nothing listens on.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn controller(dir: &Path) -> Controller {
    Controller::new(&Settings::new(dir)).unwrap()
}

pub fn get_request(name: &str, url: &str) -> SaveRequest {
    SaveRequest {
        name: name.to_string(),
        url: url.to_string(),
        method: "GET".to_string(),
        ..SaveRequest::default()
    }
}
