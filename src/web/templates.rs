// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! HTML templates for the web UI

use minijinja::Environment;

pub const BASE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{% block title %}Multimodal AI Agent - Video Summarizer{% endblock %}</title>
    <style>
        :root {
            --bg-primary: #0e1117;
            --bg-card: #1b1f2a;
            --text-primary: #fafafa;
            --text-secondary: #a3a8b8;
            --accent: #ff4b4b;
            --info: #1c83e1;
            --warning: #ffbd45;
            --border: #2a2f3d;
        }
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
        }
        .container { max-width: 1200px; margin: 0 auto; padding: 32px 20px; }
        nav { display: flex; gap: 24px; padding: 12px 20px; border-bottom: 1px solid var(--border); }
        nav a { color: var(--text-secondary); text-decoration: none; }
        nav a:hover { color: var(--text-primary); }
        h1 { margin-bottom: 4px; }
        h2 { color: var(--text-secondary); font-weight: 500; margin-bottom: 24px; }
        .card { background: var(--bg-card); border-radius: 10px; padding: 20px; margin-bottom: 20px; }
        label { display: block; margin-bottom: 6px; color: var(--text-secondary); }
        textarea { width: 100%; height: 100px; background: var(--bg-primary); color: var(--text-primary);
                   border: 1px solid var(--border); border-radius: 6px; padding: 10px; font: inherit; }
        button { background: var(--accent); color: white; border: none; border-radius: 6px;
                 padding: 10px 18px; font-size: 1em; cursor: pointer; margin-top: 12px; }
        video { max-width: 100%; margin-top: 12px; border-radius: 6px; }
        .notice { border-radius: 6px; padding: 12px 16px; margin-bottom: 20px; }
        .notice.info { background: rgba(28,131,225,0.15); color: #a8d4ff; }
        .notice.warning { background: rgba(255,189,69,0.15); color: var(--warning); }
        .notice.error { background: rgba(255,75,75,0.15); color: #ff9c9c; }
        .answer { line-height: 1.5; }
        .answer pre { background: var(--bg-primary); padding: 10px; border-radius: 6px; overflow-x: auto; }
        table { width: 100%; border-collapse: collapse; }
        td { padding: 8px; border-bottom: 1px solid var(--border); }
        td:first-child { color: var(--text-secondary); width: 40%; }
    </style>
</head>
<body>
    <nav>
        <a href="/">Analyze</a>
        <a href="/settings">Settings</a>
    </nav>
    <main class="container">
        {% block content %}{% endblock %}
    </main>
</body>
</html>"#;

pub const INDEX: &str = r#"{% extends "base.html" %}
{% block content %}
<h1>Phidata Multimodal AI Agent</h1>
<h2>Powered by Gemini</h2>

<form class="card" method="post" action="/analyze" enctype="multipart/form-data">
    <label for="video">Upload a video file</label>
    <input id="video" type="file" name="video" accept="{{ accept }}"
           title="Upload a video for AI analysis" required>
    <video id="preview" controls hidden></video>

    <label for="query" style="margin-top: 16px">What insights are you seeking from the video?</label>
    <textarea id="query" name="query"
              placeholder="Ask anything about the video content. The AI agent will analyze and gather additional information from the internet"
              title="Provide specific questions or insights you want from the video.">{{ query }}</textarea>

    <button type="submit">Analyse Video</button>
</form>

{% if warning %}<div class="notice warning">{{ warning }}</div>{% endif %}
{% if error %}<div class="notice error">An error occurred during analysis : {{ error }}</div>{% endif %}
{% if result %}
<div class="card">
    <h3>Analysis result</h3>
    <div class="answer">{{ result }}</div>{# pre-rendered, raw HTML already escaped #}
</div>
{% elif not warning and not error %}
<div class="notice info">Upload a video file to begin analysis.</div>
{% endif %}

<script>
    document.getElementById('video').addEventListener('change', function (e) {
        var file = e.target.files[0];
        var preview = document.getElementById('preview');
        if (file) {
            preview.src = URL.createObjectURL(file);
            preview.hidden = false;
        }
    });
    document.querySelector('form').addEventListener('submit', function () {
        var button = this.querySelector('button');
        button.disabled = true;
        button.textContent = 'Processing the video and gathering data ...';
    });
</script>
{% endblock %}"#;

pub const SETTINGS: &str = r#"{% extends "base.html" %}
{% block title %}Settings - Video Summarizer{% endblock %}
{% block content %}
<h1>Settings</h1>
<div class="card">
    <h3>Agent</h3>
    <table>
        <tr><td>Name</td><td>{{ config.agent.name }}</td></tr>
        <tr><td>Model</td><td>{{ config.agent.model }}</td></tr>
        <tr><td>API URL</td><td>{{ config.agent.api_url }}</td></tr>
        <tr><td>Markdown</td><td>{{ config.agent.markdown }}</td></tr>
        <tr><td>Show tool calls</td><td>{{ config.agent.show_tool_calls }}</td></tr>
        <tr><td>Web search</td><td>{{ config.search.enabled }}</td></tr>
    </table>
</div>
<div class="card">
    <h3>Uploads</h3>
    <table>
        <tr><td>Allowed extensions</td><td>{{ config.upload.allowed_extensions | join(", ") }}</td></tr>
        <tr><td>Max size (bytes)</td><td>{{ config.upload.max_bytes }}</td></tr>
        <tr><td>Poll interval (ms)</td><td>{{ config.ingestion.poll_interval_ms }}</td></tr>
        <tr><td>Max polls</td><td>{{ config.ingestion.max_poll_attempts }}</td></tr>
    </table>
</div>
{% endblock %}"#;

/// Template environment with all pages registered
pub fn environment() -> crate::Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template("base.html", BASE)?;
    env.add_template("index.html", INDEX)?;
    env.add_template("settings.html", SETTINGS)?;
    Ok(env)
}
