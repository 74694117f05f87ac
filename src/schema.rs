table! {
    comics (id) {
        id -> Integer,
        title -> Text,
        alt -> Text,
        explanation -> Text,
        image_urls -> Text,
        file_paths -> Text,
        image_count -> Integer,
        philosopher_names -> Text,
        philosopher_count -> Integer,
        collected_at -> Timestamp,
    }
}

table! {
    philosophers (id) {
        id -> Integer,
        safe_name -> Text,
        name -> Text,
    }
}

table! {
    comic_philosophers (philosopher_id, comic_id) {
        philosopher_id -> Integer,
        comic_id -> Integer,
    }
}

table! {
    progress (id) {
        id -> Integer,
        last_id -> Integer,
        last_run_at -> Nullable<Timestamp>,
    }
}

joinable!(comic_philosophers -> comics (comic_id));
joinable!(comic_philosophers -> philosophers (philosopher_id));

allow_tables_to_appear_in_same_query!(
    comics,
    comic_philosophers,
    philosophers,
    progress,
);
