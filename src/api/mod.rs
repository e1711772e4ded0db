use rocket::Route;

mod admin;
mod dashboard;
mod public;
mod voter;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(voter::routes());
    routes.extend(admin::routes());
    routes.extend(public::routes());
    routes.extend(dashboard::routes());
    routes
}
