//! Documentation handlers: the current OpenAPI document and a Swagger UI page.

use crate::state::AppState;
use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse},
};

/// Serves the pretty-printed document of the current snapshot.
pub async fn openapi_json(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshot.current();
    (
        [(header::CONTENT_TYPE, "application/json")],
        snapshot.openapi_json.clone(),
    )
}

pub async fn viewer(State(state): State<AppState>) -> Html<String> {
    let docs = &state.config.documentation;
    let spec_url = format!("/{}", docs.openapi_route.trim_start_matches('/'));
    Html(viewer_html(&docs.title, &spec_url))
}

fn viewer_html(title: &str, spec_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <link rel="stylesheet" type="text/css" href="https://cdnjs.cloudflare.com/ajax/libs/swagger-ui/5.11.0/swagger-ui.css" />
    <style>body {{ margin: 0; background: #fafafa; }}</style>
  </head>
  <body>
    <div id="swagger-ui"></div>
    <script src="https://cdnjs.cloudflare.com/ajax/libs/swagger-ui/5.11.0/swagger-ui-bundle.js" charset="UTF-8"></script>
    <script>
      window.onload = function() {{
        window.ui = SwaggerUIBundle({{
          url: "{spec_url}",
          dom_id: '#swagger-ui',
          deepLinking: true,
          presets: [SwaggerUIBundle.presets.apis],
        }});
      }};
    </script>
  </body>
</html>
"#,
        title = escape_html(title),
        spec_url = spec_url.replace('"', "%22"),
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_points_at_document_route() {
        let html = viewer_html("Shop <API>", "/api-docs/openapi.json");
        assert!(html.contains(r#"url: "/api-docs/openapi.json""#));
        assert!(html.contains("<title>Shop &lt;API&gt;</title>"));
    }
}
