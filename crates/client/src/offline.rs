//! Synthetic fallback responses.
//!
//! When neither network nor cache can satisfy a request, the caller
//! still receives a renderable document with status 200 rather than a
//! transport error. Decorative images degrade to a plain-text
//! placeholder instead of a broken-image icon.

/// Marker string present in the offline fallback document.
pub const OFFLINE_MARKER: &str = "You're Offline";

/// Body of the synthetic placeholder returned for unreachable images.
pub const IMAGE_PLACEHOLDER_BODY: &str = "Image not available";

/// The offline fallback document.
///
/// Self-contained HTML with no external dependencies; never stored in
/// any cache partition, synthesized on demand.
pub fn offline_document() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Offline - The Stove Specialist</title>
    <style>
        body {{
            font-family: 'Inter', sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            color: white;
            text-align: center;
            padding: 2rem;
            margin: 0;
            min-height: 100vh;
            display: flex;
            flex-direction: column;
            justify-content: center;
            align-items: center;
        }}
        .container {{
            max-width: 500px;
            background: rgba(255, 255, 255, 0.1);
            border: 1px solid rgba(255, 255, 255, 0.2);
            border-radius: 20px;
            padding: 3rem;
        }}
        h1 {{ font-size: 2.5rem; margin-bottom: 1rem; }}
        p {{ font-size: 1.2rem; margin-bottom: 2rem; opacity: 0.9; }}
        .retry-btn {{
            background: #f59e0b;
            color: white;
            border: none;
            padding: 1rem 2rem;
            border-radius: 50px;
            font-size: 1.1rem;
            font-weight: 600;
            cursor: pointer;
        }}
        .phone {{ font-size: 1.5rem; font-weight: bold; color: #fbbf24; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>{OFFLINE_MARKER}</h1>
        <p>It looks like you're not connected to the internet. Don't worry, you can still contact us!</p>
        <button class="retry-btn" onclick="window.location.reload()">Try Again</button>
        <p>For immediate service, call us:</p>
        <div class="phone">02 9365 2508</div>
    </div>
</body>
</html>
"#
    )
}
