use super::GenreId;

/// TMDb TV genre catalogue
const TV_GENRES: &[(GenreId, &str)] = &[
    (16, "Animation"),
    (18, "Drama"),
    (35, "Comedy"),
    (37, "Western"),
    (80, "Crime"),
    (99, "Documentary"),
    (9648, "Mystery"),
    (10751, "Family"),
    (10759, "Action & Adventure"),
    (10762, "Kids"),
    (10763, "News"),
    (10764, "Reality"),
    (10765, "Sci-Fi & Fantasy"),
    (10766, "Soap"),
    (10767, "Talk"),
    (10768, "War & Politics"),
];

/// Talk, soap and news: high-volume categories that carry little taste signal
pub const DEFAULT_DENYLISTED_GENRES: &[GenreId] = &[10767, 10766, 10763];

/// Returns the display name of a TV genre
pub fn genre_name(id: GenreId) -> Option<&'static str> {
    TV_GENRES
        .binary_search_by_key(&id, |(gid, _)| *gid)
        .ok()
        .map(|idx| TV_GENRES[idx].1)
}

/// Renders genre ids as names, dropping unknown ids
pub fn genre_names<'a>(ids: impl IntoIterator<Item = &'a GenreId>) -> Vec<&'static str> {
    ids.into_iter().filter_map(|id| genre_name(*id)).collect()
}
