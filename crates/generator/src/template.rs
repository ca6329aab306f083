use portfolio_kit_core::{Project, SiteSettings};
use pulldown_cmark::{Options, Parser, html};

/// HTML-escape a string
///
/// Escapes: & < > " '
pub fn html_escape(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#x27;".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

/// Render a Markdown description to HTML
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

/// Prefix a site-relative path with the base URL.
///
/// Absolute URLs pass through untouched.
pub fn with_base_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") || path.starts_with("//") {
        return path.to_string();
    }
    let base = if base_url.is_empty() { "./" } else { base_url };
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn render_project(project: &Project, base_url: &str) -> String {
    let image_html = project
        .image
        .as_deref()
        .map(|image| {
            format!(
                r#"<img src="{}" alt="{}" class="project-image" loading="lazy">"#,
                html_escape(&with_base_url(base_url, image)),
                html_escape(&project.title)
            )
        })
        .unwrap_or_default();

    let title_html = match &project.url {
        Some(url) => format!(
            r#"<a href="{}">{}</a>"#,
            html_escape(url),
            html_escape(&project.title)
        ),
        None => html_escape(&project.title),
    };

    let repo_html = project
        .repo
        .as_deref()
        .map(|repo| format!(r#"<a class="repo" href="{}">Source</a>"#, html_escape(repo)))
        .unwrap_or_default();

    let tags_html: String = project
        .tags
        .iter()
        .map(|tag| format!(r#"<span class="tag">{}</span>"#, html_escape(tag)))
        .collect();

    format!(
        r#"<article class="project" id="{}">
            {}
            <h2>{}</h2>
            <div class="description">{}</div>
            <div class="meta">{}{}</div>
        </article>"#,
        project.slug(),
        image_html,
        title_html,
        render_markdown(&project.description),
        tags_html,
        repo_html
    )
}

/// Generate the portfolio index page
pub fn generate_index_html(site: &SiteSettings, projects: &[Project], base_url: &str) -> String {
    let title = site.title.as_deref().unwrap_or("Portfolio");
    let description_html = site
        .description
        .as_deref()
        .map(|d| format!(r#"<p class="lede">{}</p>"#, html_escape(d)))
        .unwrap_or_default();
    let author_html = site
        .author
        .as_deref()
        .map(|a| format!("&copy; {}", html_escape(a)))
        .unwrap_or_default();

    let projects_html: String = projects
        .iter()
        .map(|project| render_project(project, base_url))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{}</title>
    <link rel="stylesheet" href="{}">
</head>
<body>
    <header>
        <h1>{}</h1>
        {}
    </header>
    <main class="projects">
        {}
    </main>
    <footer>{}</footer>
</body>
</html>"#,
        html_escape(title),
        html_escape(&with_base_url(base_url, "style.css")),
        html_escape(title),
        description_html,
        projects_html,
        author_html
    )
}

/// Default stylesheet
pub fn generate_stylesheet() -> &'static str {
    r#"* { margin: 0; padding: 0; box-sizing: border-box; }
body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
    line-height: 1.6;
    color: #333;
    background: #f5f5f5;
    padding: 2rem;
}
header, main, footer { max-width: 900px; margin: 0 auto; }
header { margin-bottom: 2rem; }
.lede { color: #666; }
.projects { display: grid; gap: 1.5rem; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); }
.project { background: white; padding: 1.5rem; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); }
.project-image { width: 100%; border-radius: 4px; margin-bottom: 1rem; }
.tag { display: inline-block; background: #eee; border-radius: 4px; padding: 0 0.5rem; margin-right: 0.25rem; font-size: 0.8rem; }
.repo { float: right; font-size: 0.9rem; }
footer { margin-top: 2rem; color: #999; font-size: 0.9rem; text-align: center; }
"#
}
