diesel::table! {
    cameras (id) {
        id -> Integer,
        cross_street_1 -> Text,
        cross_street_2 -> Text,
        zipcode -> Text,
        speed_limit -> Integer,
        direction -> Text,
    }
}
