//! Timestamp formats used inside sitemap documents.

use time::{
    OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem,
    macros::format_description,
};
use tracing::warn;

const ZULU: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

const W3C: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
);

/// `2010-12-14T10:53:21Z`, used for `<lastmod>` of flat sitemap entries.
pub fn format_zulu(time: OffsetDateTime) -> String {
    format_utc(time, ZULU, "zulu")
}

/// `2010-12-14T10:53:21+00:00`, used for `<lastmod>` of sitemap index entries.
pub fn format_w3c(time: OffsetDateTime) -> String {
    format_utc(time, W3C, "w3c")
}

/// An unrepresentable timestamp leaves `<lastmod>` empty rather than failing
/// the whole document.
fn format_utc(
    time: OffsetDateTime,
    format: &[BorrowedFormatItem<'_>],
    name: &'static str,
) -> String {
    let Some(utc) = time.checked_to_offset(UtcOffset::UTC) else {
        warn!(
            target = "sitemapper::sitemap",
            format = name,
            %time,
            "timestamp has no UTC representation"
        );
        return String::new();
    };

    match utc.format(format) {
        Ok(formatted) => formatted,
        Err(err) => {
            warn!(
                target = "sitemapper::sitemap",
                format = name,
                %time,
                error = %err,
                "failed to format timestamp"
            );
            String::new()
        }
    }
}
