//! Line codec for the two backing files.
//!
//! Books are written as `id,title,author,category,issued`; members as
//! `id,name,email,ids` where `ids` is a `|`-joined list. Commas inside text
//! fields are replaced by [`COMMA_ESCAPE`] on the way out and restored on the
//! way in. The replacement is a plain substring swap, so text that already
//! contains the token does not survive a round trip.
//!
//! Decoding is tolerant: a line that does not parse yields `None` and the
//! caller is expected to skip it.

use crate::domain::{Book, BookId, Member, MemberId};

/// Field separator for both record kinds
pub const FIELD_SEPARATOR: char = ',';

/// Separator between issued book ids in a member line
pub const ISSUED_SEPARATOR: &str = "|";

/// Stand-in for a literal comma inside a text field
pub const COMMA_ESCAPE: &str = "&#44;";

const BOOK_FIELDS: usize = 5;
const MEMBER_FIELDS: usize = 4;
const MEMBER_REQUIRED_FIELDS: usize = 3;

pub fn escape(s: &str) -> String {
    s.replace(FIELD_SEPARATOR, COMMA_ESCAPE)
}

pub fn unescape(s: &str) -> String {
    s.replace(COMMA_ESCAPE, ",")
}

/// Encode a book as one line (without the newline)
pub fn encode_book(book: &Book) -> String {
    format!(
        "{}{sep}{}{sep}{}{sep}{}{sep}{}",
        book.id,
        escape(&book.title),
        escape(&book.author),
        escape(&book.category),
        book.issued,
        sep = FIELD_SEPARATOR
    )
}

/// Decode a book line.
///
/// Returns `None` if the line has fewer than five fields or the id is not
/// an integer. The issued flag is true only for `true` in any letter case.
pub fn decode_book(line: &str) -> Option<Book> {
    let parts: Vec<&str> = line.splitn(BOOK_FIELDS, FIELD_SEPARATOR).collect();
    if parts.len() < BOOK_FIELDS {
        return None;
    }

    let id: BookId = parts[0].parse().ok()?;

    Some(Book {
        id,
        title: unescape(parts[1]),
        author: unescape(parts[2]),
        category: unescape(parts[3]),
        issued: parts[4].eq_ignore_ascii_case("true"),
    })
}

/// Encode a member as one line. The trailing separator is written even when
/// the member holds no books.
pub fn encode_member(member: &Member) -> String {
    let issued: Vec<String> = member.issued_books.iter().map(ToString::to_string).collect();

    format!(
        "{}{sep}{}{sep}{}{sep}{}",
        member.id,
        escape(&member.name),
        escape(&member.email),
        issued.join(ISSUED_SEPARATOR),
        sep = FIELD_SEPARATOR
    )
}

/// Decode a member line.
///
/// Needs at least the id, name and email fields. A present, non-blank fourth
/// field is split on `|`; blank tokens are skipped and any other token that
/// is not an integer rejects the whole line.
pub fn decode_member(line: &str) -> Option<Member> {
    let parts: Vec<&str> = line.splitn(MEMBER_FIELDS, FIELD_SEPARATOR).collect();
    if parts.len() < MEMBER_REQUIRED_FIELDS {
        return None;
    }

    let id: MemberId = parts[0].parse().ok()?;

    let mut issued = Vec::new();
    if let Some(field) = parts.get(3).filter(|f| !f.trim().is_empty()) {
        for token in field.split(ISSUED_SEPARATOR) {
            if token.trim().is_empty() {
                continue;
            }
            issued.push(token.parse::<BookId>().ok()?);
        }
    }

    Some(Member::new(id, unescape(parts[1]), unescape(parts[2])).with_issued_books(issued))
}
