use axum::{extract::Request, http::header, middleware::Next, response::Response};

pub async fn security_headers(req: Request, next: Next) -> Response {
    // Reject TRACE and TRACK methods (OWASP Finding: Proxy Disclosure)
    let method = req.method();
    if method == "TRACE" || method == "TRACK" {
        return axum::response::Response::builder()
            .status(axum::http::StatusCode::METHOD_NOT_ALLOWED)
            .body(axum::body::Body::empty())
            .unwrap();
    }

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    // HSTS: 1 year, include subdomains
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        header::HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    // frame-ancestors allows the frontend to frame document previews (PDFs)
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        header::HeaderValue::from_static(
            "default-src 'none'; frame-ancestors 'self' http://localhost:* http://127.0.0.1:*;",
        ),
    );

    headers.insert(
        header::REFERRER_POLICY,
        header::HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    // Prevent MIME sniffing
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        header::HeaderValue::from_static("nosniff"),
    );

    // Suppress fingerprinting
    headers.insert(
        header::SERVER,
        header::HeaderValue::from_static("advocacia-backend"),
    );

    // Case data and documents must never land in shared caches
    if !headers.contains_key(header::CACHE_CONTROL) {
        headers.insert(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        );
    }

    response
}
