use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use std::collections::HashMap;

use super::AppState;
use crate::i18n;
use crate::notifications::NotificationHub;

pub const LANGUAGE_COOKIE: &str = "lang";

/// Language stored in the `lang` cookie, if any.
pub fn cookie_language(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == LANGUAGE_COOKIE)
        .map(|(_, value)| value)
}

pub async fn set_language(Path(lang): Path<String>, headers: HeaderMap) -> Response {
    let target = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("/")
        .to_string();
    if !i18n::is_supported(&lang) {
        return Redirect::to(&target).into_response();
    }
    let cookie = format!("{LANGUAGE_COOKIE}={lang}; Path=/; Max-Age=31536000; SameSite=Lax");
    ([(header::SET_COOKIE, cookie)], Redirect::to(&target)).into_response()
}

pub async fn translations(headers: HeaderMap) -> Json<HashMap<&'static str, &'static str>> {
    Json(i18n::table(cookie_language(&headers)).clone())
}

pub async fn scan(headers: HeaderMap) -> Html<String> {
    let lang = i18n::language_of(cookie_language(&headers));
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="{lang}">
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<h1>{title}</h1>
<form id="scan">
  <input id="code" name="code" autofocus autocomplete="off">
  <button type="submit">{search}</button>
</form>
<script>
document.getElementById("scan").addEventListener("submit", function (event) {{
  event.preventDefault();
  var code = document.getElementById("code").value.trim();
  if (code.indexOf("/stock/items/") !== -1) {{
    code = code.split("/stock/items/")[1].split("/")[0];
  }}
  if (code) {{
    window.location.href = "/stock/items/" + encodeURIComponent(code);
  }}
}});
</script>
</body>
</html>
"#,
        title = i18n::translate("Scan QR Code", Some(lang)),
        search = i18n::translate("Search", Some(lang)),
    ))
}

pub async fn events(ws: WebSocketUpgrade, State(service): State<AppState>) -> Response {
    let sender = service.hub().sender();
    ws.on_upgrade(move |socket| NotificationHub::handle_socket(socket, sender))
}
