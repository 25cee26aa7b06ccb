use rocket::{Catcher, Route};

mod error;
mod live;
mod routes;

pub use error::{ApiError, ErrorBody};
pub use routes::{History, PeopleResponse, SendResponse};

pub fn routes() -> Vec<Route> {
    routes![routes::history, routes::send, routes::people, live::live]
}

pub fn catchers() -> Vec<Catcher> {
    catchers![error::json_catcher]
}
