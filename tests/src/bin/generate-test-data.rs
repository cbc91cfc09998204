use chrono::{Duration, Utc};
use postview_api::{PostId, RawPost, RawTime};
use rand::{seq::SliceRandom, Rng};

const NUM_AUTHORS: usize = 5;
const LOCATIONS: &[&str] = &[
    "San Francisco",
    "Sydney",
    "Paris",
    "Tokyo",
    "Buenos Aires",
    "Nairobi",
];

const NUM_POSTS: i64 = 200;
const POST_WORD_COUNT: usize = 40;
const MAX_AGE_DAYS: i64 = 365;

fn gen_time(rng: &mut impl Rng) -> RawTime {
    let max_age = Duration::days(MAX_AGE_DAYS).num_seconds();
    let time = Utc::now().timestamp() - rng.gen_range(0..max_age);
    // the posts file format accepts both numbers and numeric strings
    match rng.gen_bool(0.5) {
        true => RawTime::Integer(time),
        false => RawTime::Text(time.to_string()),
    }
}

fn main() {
    let mut rng = rand::thread_rng();
    let authors = (0..NUM_AUTHORS)
        .map(|_| lipsum::lipsum_title())
        .collect::<Vec<_>>();

    let posts = (1..=NUM_POSTS)
        .map(|id| RawPost {
            id: PostId(id),
            location: String::from(*LOCATIONS.choose(&mut rng).expect("no locations")),
            time: gen_time(&mut rng),
            author: authors.choose(&mut rng).expect("no authors").clone(),
            text: lipsum::lipsum_words(POST_WORD_COUNT),
        })
        .collect::<Vec<_>>();

    println!("{}", serde_json::to_string_pretty(&posts).expect("serializing posts"));
}
