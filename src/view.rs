use crate::domain::{Capability, ViewState, NOT_CONFIGURED_MESSAGE};
use crate::markdown::{escape_html, render_markdown};

const PAGE_TITLE: &str = "AI 금융 용어 사전";

const STYLE: &str = r#"
body { margin: 0; font-family: "Pretendard", "Apple SD Gothic Neo", "Noto Sans KR", sans-serif; background: #f5f7fb; color: #1f2937; }
main { max-width: 720px; margin: 0 auto; padding: 3rem 1.25rem; }
header h1 { margin: 0 0 0.5rem; font-size: 2rem; }
header p { margin: 0 0 2rem; color: #6b7280; }
form { display: flex; gap: 0.5rem; margin-bottom: 2rem; }
input[type=text] { flex: 1; padding: 0.75rem 1rem; font-size: 1rem; border: 1px solid #d1d5db; border-radius: 0.5rem; }
button { padding: 0.75rem 1.25rem; font-size: 1rem; border: 0; border-radius: 0.5rem; background: #2563eb; color: white; cursor: pointer; }
button:disabled { background: #93c5fd; cursor: wait; }
.panel { background: white; border-radius: 0.75rem; padding: 1.5rem; box-shadow: 0 1px 3px rgba(0,0,0,0.08); }
.placeholder { color: #6b7280; text-align: center; }
.loading { display: flex; align-items: center; gap: 0.75rem; color: #4b5563; }
.spinner { width: 1.25rem; height: 1.25rem; border: 3px solid #bfdbfe; border-top-color: #2563eb; border-radius: 50%; animation: spin 0.8s linear infinite; }
@keyframes spin { to { transform: rotate(360deg); } }
.alert { background: #fef2f2; color: #b91c1c; border: 1px solid #fecaca; }
.notice { background: #fffbeb; color: #92400e; border: 1px solid #fde68a; margin-bottom: 2rem; }
.definition h2 { margin-top: 0; color: #1d4ed8; }
.markdown-content table { border-collapse: collapse; }
.markdown-content th, .markdown-content td { border: 1px solid #e5e7eb; padding: 0.4rem 0.6rem; }
"#;

const SCRIPT: &str = r#"
(function () {
  const form = document.getElementById("search-form");
  const input = document.getElementById("term");
  const button = document.getElementById("search-button");
  const result = document.getElementById("result");
  let shown = -1;

  // The 202 body and the SSE stream race; never step back to an older revision.
  function apply(view) {
    if (view.revision <= shown) return;
    shown = view.revision;
    result.innerHTML = view.html;
    const busy = view.state.state === "loading";
    if (button) button.disabled = busy;
    if (input) input.disabled = busy;
  }

  if (form) {
    form.addEventListener("submit", async function (e) {
      e.preventDefault();
      const term = input.value.trim();
      if (!term || button.disabled) return;
      try {
        const resp = await fetch("/v1/search", {
          method: "POST",
          headers: { "content-type": "application/json" },
          body: JSON.stringify({ term: term })
        });
        if (resp.status === 202) apply(await resp.json());
      } catch (err) {
        console.error(err);
      }
    });
  }

  const events = new EventSource("/v1/stream");
  events.addEventListener("view", function (e) { apply(JSON.parse(e.data)); });
})();
"#;

/// Result panel markup for the given state.
pub fn render_fragment(state: &ViewState) -> String {
    match state {
        ViewState::Idle => concat!(
            r#"<div class="panel placeholder">"#,
            "<p>궁금한 금융 용어를 검색해보세요.</p>",
            "<p>예: ESG, PER, 공매도, 양적완화</p>",
            "</div>"
        )
        .to_string(),
        ViewState::Loading { term } => format!(
            r#"<div class="panel loading" aria-busy="true"><div class="spinner"></div><p>'{}'의 정의를 불러오는 중입니다...</p></div>"#,
            escape_html(term)
        ),
        ViewState::Error { message } => format!(
            r#"<div class="panel alert" role="alert"><strong>오류</strong><p>{}</p></div>"#,
            escape_html(message)
        ),
        ViewState::Success { term, markdown } => format!(
            r#"<article class="panel definition"><h2>{}</h2><div class="markdown-content">{}</div></article>"#,
            escape_html(term),
            render_markdown(markdown)
        ),
    }
}

/// Full document for `GET /`.
pub fn render_page(state: &ViewState, capability: &Capability) -> String {
    let busy = if state.is_loading() { " disabled" } else { "" };
    let controls = if capability.configured {
        format!(
            r#"<form id="search-form" method="post" action="/search">
<input id="term" name="term" type="text" placeholder="금융 용어를 입력하세요" autocomplete="off" required{busy}>
<button id="search-button" type="submit"{busy}>검색</button>
</form>"#
        )
    } else {
        format!(
            r#"<div class="panel notice" role="status">{}</div>"#,
            escape_html(NOT_CONFIGURED_MESSAGE)
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="ko">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
<main>
<header>
<h1>{title}</h1>
<p>AI가 금융 용어를 쉽고 간단하게 설명해드립니다.</p>
</header>
{controls}
<section id="result" aria-live="polite">{fragment}</section>
</main>
<script>{script}</script>
</body>
</html>
"#,
        title = PAGE_TITLE,
        style = STYLE,
        controls = controls,
        fragment = render_fragment(state),
        script = SCRIPT,
    )
}
