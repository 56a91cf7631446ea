//! Camera storage


use std::fmt;
use std::str::FromStr;

use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::db::DatabaseContext;
use crate::db::schema::cameras;
use crate::error::{Error, Result};


/// Direction of traffic a camera enforces
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[derive(AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
pub enum Direction {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl Direction {

    /// Every direction, in the order they are reported to clients
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::S,
        Direction::E,
        Direction::W,
        Direction::NE,
        Direction::NW,
        Direction::SE,
        Direction::SW,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::N  => "N",
            Direction::S  => "S",
            Direction::E  => "E",
            Direction::W  => "W",
            Direction::NE => "NE",
            Direction::NW => "NW",
            Direction::SE => "SE",
            Direction::SW => "SW",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


/// Error produced when parsing an unknown direction
#[derive(Debug)]
pub struct InvalidDirection;

impl fmt::Display for InvalidDirection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let allowed = Direction::ALL.iter()
            .map(|d| format!("'{}'", d))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "Direction must be one of [{}]", allowed)
    }
}

impl std::error::Error for InvalidDirection {}

impl FromStr for Direction {
    type Err = InvalidDirection;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Direction::ALL.iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or(InvalidDirection)
    }
}

impl ToSql<Text, Sqlite> for Direction {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.as_str());
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Sqlite> for Direction {
    fn from_sql(value: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let text = <String as FromSql<Text, Sqlite>>::from_sql(value)?;
        Ok(text.parse()?)
    }
}


/// A speed camera at a street intersection
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[derive(Identifiable, Queryable, Selectable)]
#[diesel(table_name = cameras)]
#[diesel(check_for_backend(Sqlite))]
pub struct Camera {
    pub id: i32,
    pub cross_street_1: String,
    pub cross_street_2: String,
    pub zipcode: String,
    pub speed_limit: i32,
    pub direction: Direction,
}


/// Information needed to create a new camera
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Insertable)]
#[diesel(table_name = cameras)]
pub struct NewCamera {
    pub cross_street_1: String,
    pub cross_street_2: String,
    pub zipcode: String,
    pub speed_limit: i32,
    pub direction: Direction,
}

impl NewCamera {

    /// Message reported when this camera's intersection is already taken
    pub fn conflict_message(&self) -> String {
        format!(
            "Camera already exists at {} and {} in zipcode {}",
            self.cross_street_1,
            self.cross_street_2,
            self.zipcode,
        )
    }
}


/// Fields to change on an existing camera
///
/// `None` leaves the stored value untouched.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(AsChangeset)]
#[diesel(table_name = cameras)]
pub struct CameraChanges {
    pub cross_street_1: Option<String>,
    pub cross_street_2: Option<String>,
    pub zipcode: Option<String>,
    pub speed_limit: Option<i32>,
    pub direction: Option<Direction>,
}

impl CameraChanges {

    pub fn is_empty(&self) -> bool {
        self.cross_street_1.is_none()
            && self.cross_street_2.is_none()
            && self.zipcode.is_none()
            && self.speed_limit.is_none()
            && self.direction.is_none()
    }
}


/// Maps a unique index violation to a conflict
fn conflict_or(err: DieselError, msg: impl FnOnce() -> String) -> Error {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => Error::Conflict(msg()),
        err => err.into(),
    }
}


/// Escapes `LIKE` wildcards so a term matches literally
fn like_pattern(term: &str) -> String {

    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');

    pattern
}


/// Durable storage of camera records
///
/// Every method checks out its own connection and returns it to the pool
/// before returning. Inputs are trusted to be well formed.
pub trait CameraStore: DatabaseContext + Sized {

    /// Retrieves all cameras in the given zipcode
    fn cameras_in_zipcode(&self, zip: &str) -> Result<Vec<Camera>> {

        trace!("retrieving cameras in zipcode {}", zip);
        let mut conn = self.conn()?;
        let found = cameras::table
            .filter(cameras::zipcode.eq(zip))
            .order(cameras::id)
            .select(Camera::as_select())
            .load(&mut conn)?;

        Ok(found)
    }

    /// Retrieves cameras in the given zipcode on a street containing `street`
    ///
    /// Matching considers either cross street. Case is ignored for ASCII
    /// letters only (SQLite `LIKE`), so "élm" does not match "ÉLM".
    fn search_cameras(&self, zip: &str, street: &str) -> Result<Vec<Camera>> {

        trace!("searching zipcode {} for streets matching \"{}\"", zip, street);
        let pattern = like_pattern(street);
        let mut conn = self.conn()?;
        let found = cameras::table
            .filter(cameras::zipcode.eq(zip))
            .filter(
                cameras::cross_street_1.like(&pattern).escape('\\')
                    .or(cameras::cross_street_2.like(&pattern).escape('\\'))
            )
            .order(cameras::id)
            .select(Camera::as_select())
            .load(&mut conn)?;

        Ok(found)
    }

    /// Retrieves the specified camera, if it exists
    fn get_camera(&self, id: i32) -> Result<Option<Camera>> {

        trace!("retrieving camera {} from database", id);
        let mut conn = self.conn()?;
        let camera = cameras::table
            .find(id)
            .select(Camera::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(camera)
    }

    /// Retrieves the camera at exactly the given intersection, if any
    fn find_duplicate_camera(
        &self,
        street_1: &str,
        street_2: &str,
        zip: &str,
    ) -> Result<Option<Camera>>
    {
        let mut conn = self.conn()?;
        let camera = cameras::table
            .filter(cameras::cross_street_1.eq(street_1))
            .filter(cameras::cross_street_2.eq(street_2))
            .filter(cameras::zipcode.eq(zip))
            .select(Camera::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(camera)
    }

    /// Adds a new camera to the database
    ///
    /// Fails with `Error::Conflict` if the intersection is already taken.
    fn create_camera(&self, camera: &NewCamera) -> Result<Camera> {

        debug!("adding camera at {} and {} to database", camera.cross_street_1, camera.cross_street_2);
        let mut conn = self.conn()?;
        let created = diesel::insert_into(cameras::table)
            .values(camera)
            .returning(Camera::as_returning())
            .get_result(&mut conn)
            .map_err(|err| conflict_or(err, || camera.conflict_message()))?;

        Ok(created)
    }

    /// Applies `changes` to the specified camera
    ///
    /// Returns `None` if the camera does not exist.
    fn update_camera(&self, id: i32, changes: &CameraChanges) -> Result<Option<Camera>> {

        if changes.is_empty() {
            trace!("no changes requested for camera {}", id);
            return self.get_camera(id);
        }

        debug!("saving changes to camera {}", id);
        let mut conn = self.conn()?;
        let updated = diesel::update(cameras::table.find(id))
            .set(changes)
            .returning(Camera::as_returning())
            .get_result(&mut conn)
            .optional()
            .map_err(|err| conflict_or(err, || {
                String::from("Another camera already exists at the updated intersection")
            }))?;

        Ok(updated)
    }

    /// Permanently removes the specified camera
    ///
    /// Returns whether a camera was removed.
    fn delete_camera(&self, id: i32) -> Result<bool> {

        debug!("deleting camera {} from database", id);
        let mut conn = self.conn()?;
        let removed = diesel::delete(cameras::table.find(id))
            .execute(&mut conn)?;

        Ok(removed > 0)
    }

    /// Counts all stored cameras
    fn camera_count(&self) -> Result<i64> {

        let mut conn = self.conn()?;
        let count = cameras::table
            .count()
            .get_result(&mut conn)?;

        Ok(count)
    }
}

impl<T: DatabaseContext + Sized> CameraStore for T {}


/// Sample intersections stored on first run
const SAMPLE_CAMERAS: [(&str, &str, &str, i32, Direction); 10] = [
    ("5th Ave",       "W 42nd St",      "10036", 25, Direction::N),
    ("Broadway",      "W 34th St",      "10001", 25, Direction::S),
    ("Park Ave",      "E 59th St",      "10022", 30, Direction::E),
    ("Madison Ave",   "E 72nd St",      "10021", 25, Direction::W),
    ("Wilshire Blvd", "S Beverly Dr",   "90212", 35, Direction::W),
    ("Sunset Blvd",   "N Highland Ave", "90028", 35, Direction::E),
    ("Michigan Ave",  "E Randolph St",  "60601", 30, Direction::N),
    ("State St",      "W Madison St",   "60602", 25, Direction::S),
    ("Market St",     "5th St",         "94103", 25, Direction::NE),
    ("Lombard St",    "Hyde St",        "94133", 15, Direction::E),
];


/// Stores the sample cameras if the database holds no cameras yet
///
/// Returns the number of cameras inserted.
pub fn maybe_seed_sample_cameras<D: DatabaseContext>(db: &D) -> Result<usize> {

    let mut conn = db.conn()?;

    let inserted = conn.transaction::<_, Error, _>(|conn| {

        let count: i64 = cameras::table
            .count()
            .get_result(conn)?;
        if count > 0 {
            trace!("database already holds {} cameras, skipping sample data", count);
            return Ok(0);
        }

        let samples: Vec<NewCamera> = SAMPLE_CAMERAS.iter()
            .map(|&(street_1, street_2, zip, speed_limit, direction)| NewCamera {
                cross_street_1: street_1.into(),
                cross_street_2: street_2.into(),
                zipcode: zip.into(),
                speed_limit,
                direction,
            })
            .collect();

        Ok(diesel::insert_into(cameras::table)
            .values(&samples)
            .execute(conn)?)
    })?;

    if inserted > 0 {
        info!("stored {} sample cameras", inserted);
    }

    Ok(inserted)
}
