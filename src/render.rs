// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::episode::Episode;

/// Appended to every page title
pub const SITE_NAME: &str = "Podcastr";

/// Render a complete HTML document for one episode
///
/// Text fields are escaped. `description` is trusted markup from the backend
/// and is embedded byte-for-byte. The play control carries the episode as
/// JSON in `data-episode` for the client-side player.
pub fn render_episode_page(episode: &Episode) -> String {
    let title = encode_text(&episode.title);
    let player_payload = serde_json::json!({
        "id": episode.id,
        "title": episode.title,
        "members": episode.members,
        "thumbnail": episode.thumbnail,
        "duration": episode.duration,
        "durationAtString": episode.duration_at_string,
        "url": episode.url,
        "publishedAt": episode.published_at,
        "description": episode.description,
    })
    .to_string();

    let mut html = String::with_capacity(1024 + episode.description.len());
    html.push_str("<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{} | {}</title>\n", title, SITE_NAME));
    html.push_str("</head>\n<body>\n<div class=\"episode\">\n");

    html.push_str("<div class=\"thumbnailContainer\">\n");
    html.push_str(
        "<a href=\"/\"><button type=\"button\"><img src=\"/arrow-left.svg\" alt=\"Voltar\"></button></a>\n",
    );
    html.push_str(&format!(
        "<img width=\"700\" height=\"160\" style=\"object-fit: cover\" src=\"{}\" alt=\"\">\n",
        encode_double_quoted_attribute(&episode.thumbnail)
    ));
    html.push_str(&format!(
        "<button type=\"button\" class=\"play\" data-episode=\"{}\"><img src=\"/play.svg\" alt=\"Tocar episódio\"></button>\n",
        encode_double_quoted_attribute(&player_payload)
    ));
    html.push_str("</div>\n");

    html.push_str("<header>\n");
    html.push_str(&format!("<h1>{}</h1>\n", title));
    html.push_str(&format!("<span>{}</span>\n", encode_text(&episode.members)));
    html.push_str(&format!("<span>{}</span>\n", encode_text(&episode.published_at)));
    html.push_str(&format!(
        "<span>{}</span>\n",
        encode_text(&episode.duration_at_string)
    ));
    html.push_str("</header>\n");

    html.push_str("<div class=\"description\">");
    html.push_str(&episode.description);
    html.push_str("</div>\n");

    html.push_str("</div>\n</body>\n</html>\n");
    html
}
