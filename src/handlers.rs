//! HTTP handlers for the camera API


use actix_web::HttpResponse;
use actix_web::web::{self, Data, Json, Path, Query, ServiceConfig};
use log::{debug, info};

use crate::api::{CameraCreate, CameraUpdate, Health, Info, Message, SearchQuery, validate_zipcode};
use crate::cameras::{Camera, CameraStore};
use crate::db::ConnectionPool;
use crate::error::{Error, Result};


/// Handles *GET /*
async fn get_info() -> Json<Info> {
    Json(Info {
        message: String::from("Speed Camera API"),
        version: String::from(env!("CARGO_PKG_VERSION")),
    })
}


/// Handles *GET /health*
async fn get_health() -> Json<Health> {
    Json(Health {
        status: String::from("healthy"),
    })
}


/// Retrieves all cameras in a zipcode
async fn get_cameras_by_zipcode(
    pool: Data<ConnectionPool>,
    path: Path<String>,
) -> Result<Json<Vec<Camera>>>
{
    let zip = path.into_inner();
    validate_zipcode(&zip)?;

    let pool = pool.get_ref().clone();
    let cameras = web::block(move || pool.cameras_in_zipcode(&zip))
        .await??;

    Ok(Json(cameras))
}


/// Searches a zipcode for cameras on a named street
async fn search_cameras(
    pool: Data<ConnectionPool>,
    query: Query<SearchQuery>,
) -> Result<Json<Vec<Camera>>>
{
    let query = query.into_inner();
    query.validate()?;

    let pool = pool.get_ref().clone();
    let cameras = web::block(move || pool.search_cameras(&query.zipcode, &query.street))
        .await??;

    Ok(Json(cameras))
}


/// Creates a new camera
///
/// A camera may not share both cross streets and its zipcode with an
/// existing camera.
async fn post_camera(
    pool: Data<ConnectionPool>,
    body: Json<CameraCreate>,
) -> Result<HttpResponse>
{
    let new_cam = body.into_inner().validate()?;

    let pool = pool.get_ref().clone();
    let camera = web::block(move || {

        let existing = pool.find_duplicate_camera(
            &new_cam.cross_street_1,
            &new_cam.cross_street_2,
            &new_cam.zipcode,
        )?;
        if let Some(existing) = existing {
            debug!("intersection already covered by camera {}", existing.id);
            return Err(Error::Conflict(new_cam.conflict_message()));
        }

        pool.create_camera(&new_cam)
    }).await??;

    info!("created camera {}", camera.id);

    Ok(HttpResponse::Created().json(camera))
}


fn camera_not_found() -> Error {
    Error::NotFound(String::from("Camera not found"))
}


/// Narrows a requested id to the stored id range
///
/// No camera can exist outside the `i32` range, so such ids are not found.
fn camera_id(raw: i64) -> Result<i32> {
    i32::try_from(raw)
        .map_err(|_| camera_not_found())
}


/// Updates the supplied fields of the specified camera
async fn put_camera(
    pool: Data<ConnectionPool>,
    path: Path<i64>,
    body: Json<CameraUpdate>,
) -> Result<Json<Camera>>
{
    let changes = body.into_inner().validate()?;
    let id = camera_id(path.into_inner())?;

    let pool = pool.get_ref().clone();
    let camera = web::block(move || pool.update_camera(id, &changes))
        .await??
        .ok_or_else(camera_not_found)?;

    info!("updated camera {}", id);

    Ok(Json(camera))
}


/// Permanently deletes the specified camera
async fn delete_camera(
    pool: Data<ConnectionPool>,
    path: Path<i64>,
) -> Result<Json<Message>>
{
    let id = camera_id(path.into_inner())?;

    let pool = pool.get_ref().clone();
    let removed = web::block(move || pool.delete_camera(id))
        .await??;
    if !removed {
        return Err(camera_not_found());
    }

    info!("deleted camera {}", id);

    Ok(Json(Message {
        message: String::from("Camera deleted successfully"),
    }))
}


/// Configures the camera API
///
/// Requests that cannot be extracted (malformed JSON, missing query
/// parameters, non-numeric ids) are reported as validation errors. The
/// `ConnectionPool` must be registered as application data.
pub fn configure(service: &mut ServiceConfig) {

    service.app_data(web::JsonConfig::default()
        .error_handler(|err, _req| Error::validation(err).into()));
    service.app_data(web::QueryConfig::default()
        .error_handler(|err, _req| Error::validation(err).into()));
    service.app_data(web::PathConfig::default()
        .error_handler(|err, _req| Error::validation(err).into()));

    service.route("/", web::get().to(get_info));
    service.route("/health", web::get().to(get_health));

    // Must precede /cameras/{id}
    service.route("/cameras/search", web::get().to(search_cameras));
    service.route("/cameras/zipcode/{zipcode}", web::get().to(get_cameras_by_zipcode));

    service.route("/cameras", web::post().to(post_camera));
    service.route("/cameras/{id}", web::put().to(put_camera));
    service.route("/cameras/{id}", web::delete().to(delete_camera));
}


#[cfg(test)]
mod tests {

    use actix_web::{App, test};
    use actix_web::http::StatusCode;
    use serde_json::{json, Value};

    use super::*;
    use crate::db;

    fn pool() -> ConnectionPool {
        db::connect(":memory:", 1).unwrap()
    }

    macro_rules! service {
        ($pool:expr) => {
            test::init_service(
                App::new()
                    .app_data(Data::new($pool.clone()))
                    .configure(configure)
            ).await
        };
    }

    fn main_st() -> Value {
        json!({
            "cross_street_1": "Main St",
            "cross_street_2": "1st Ave",
            "zipcode": "12345",
            "speed_limit": 25,
            "direction": "N",
        })
    }

    #[actix_web::test]
    async fn health_is_constant() {
        let app = service!(pool());

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body, json!({ "status": "healthy" }));
    }

    #[actix_web::test]
    async fn info_reports_version() {
        let app = service!(pool());

        let req = test::TestRequest::get().uri("/").to_request();
        let body: Info = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.message, "Speed Camera API");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn create_returns_created_camera() {
        let app = service!(pool());

        let req = test::TestRequest::post().uri("/cameras").set_json(main_st()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let camera: Camera = test::read_body_json(resp).await;
        assert_eq!(camera.cross_street_1, "Main St");
        assert_eq!(camera.zipcode, "12345");
    }

    #[actix_web::test]
    async fn duplicate_create_is_rejected() {
        let pool = pool();
        let app = service!(pool);

        let req = test::TestRequest::post().uri("/cameras").set_json(main_st()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post().uri("/cameras").set_json(main_st()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], "Camera already exists at Main St and 1st Ave in zipcode 12345");
        assert_eq!(pool.camera_count().unwrap(), 1);
    }

    #[actix_web::test]
    async fn invalid_create_is_rejected() {
        let app = service!(pool());

        for (field, value) in [
            ("zipcode", json!("1234")),
            ("direction", json!("NNE")),
            ("speed_limit", json!(4)),
            ("speed_limit", json!(86)),
            ("cross_street_1", json!("")),
        ] {
            let mut body = main_st();
            body[field] = value;

            let req = test::TestRequest::post().uri("/cameras").set_json(body).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", field);
        }
    }

    #[actix_web::test]
    async fn malformed_body_is_a_validation_error() {
        let app = service!(pool());

        let mut body = main_st();
        body.as_object_mut().unwrap().remove("direction");

        let req = test::TestRequest::post().uri("/cameras").set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["detail"].is_string());
    }

    #[actix_web::test]
    async fn zipcode_listing_validates_zipcode() {
        let app = service!(pool());

        let req = test::TestRequest::get().uri("/cameras/zipcode/1234").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "detail": "Invalid zipcode format. Must be 5 digits." }));
    }

    #[actix_web::test]
    async fn empty_zipcode_is_an_empty_list() {
        let app = service!(pool());

        let req = test::TestRequest::get().uri("/cameras/zipcode/00000").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Vec<Camera> = test::read_body_json(resp).await;
        assert!(body.is_empty());
    }

    #[actix_web::test]
    async fn search_finds_either_street() {
        let app = service!(pool());

        let req = test::TestRequest::post().uri("/cameras").set_json(main_st()).to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get().uri("/cameras/search?street=1ST&zipcode=12345").to_request();
        let found: Vec<Camera> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(found.len(), 1);

        let req = test::TestRequest::get().uri("/cameras/search?street=1st&zipcode=54321").to_request();
        let found: Vec<Camera> = test::call_and_read_body_json(&app, req).await;
        assert!(found.is_empty());
    }

    #[actix_web::test]
    async fn search_requires_parameters() {
        let app = service!(pool());

        for uri in [
            "/cameras/search?zipcode=12345",
            "/cameras/search?street=&zipcode=12345",
            "/cameras/search?street=main",
            "/cameras/search?street=main&zipcode=123",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
        }
    }

    #[actix_web::test]
    async fn update_of_missing_camera_is_not_found() {
        let app = service!(pool());

        let req = test::TestRequest::put().uri("/cameras/99").set_json(json!({ "speed_limit": 30 })).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "detail": "Camera not found" }));
    }

    #[actix_web::test]
    async fn update_validates_before_lookup() {
        let app = service!(pool());

        let req = test::TestRequest::put().uri("/cameras/99").set_json(json!({ "direction": "up" })).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn non_numeric_id_is_rejected() {
        let app = service!(pool());

        let req = test::TestRequest::delete().uri("/cameras/abc").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn ids_beyond_stored_range_are_not_found() {
        let app = service!(pool());

        for uri in ["/cameras/2147483648", "/cameras/99999999999", "/cameras/-2147483649"] {
            let req = test::TestRequest::delete().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "DELETE {}", uri);

            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body, json!({ "detail": "Camera not found" }));

            let req = test::TestRequest::put().uri(uri).set_json(json!({ "speed_limit": 30 })).to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND, "PUT {}", uri);
        }
    }

    #[::core::prelude::v1::test]
    fn camera_id_narrows_to_stored_range() {
        assert_eq!(camera_id(11).unwrap(), 11);
        assert_eq!(camera_id(i64::from(i32::MAX)).unwrap(), i32::MAX);
        assert!(matches!(camera_id(i64::from(i32::MAX) + 1), Err(Error::NotFound(_))));
    }

    #[actix_web::test]
    async fn delete_of_missing_camera_is_not_found() {
        let app = service!(pool());

        let req = test::TestRequest::delete().uri("/cameras/1").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
