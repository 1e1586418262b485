//! Security headers added to every storefront response.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

/// Content Security Policy for storefront pages.
///
/// Scripts and frames are limited to our own origin plus reCAPTCHA. Product
/// images come from the image CDN. Forms may post back to us, and checkout
/// redirects to the payment gateway.
pub const CONTENT_SECURITY_POLICY_VALUE: &str = "default-src 'none'; \
     script-src 'self' https://www.google.com/recaptcha/ https://www.gstatic.com/recaptcha/; \
     style-src 'self'; \
     font-src 'self'; \
     img-src 'self' data: https://res.cloudinary.com; \
     connect-src 'self'; \
     frame-src https://www.google.com/recaptcha/ https://recaptcha.google.com/recaptcha/; \
     object-src 'none'; \
     base-uri 'self'; \
     form-action 'self' https://*.mercadopago.com https://*.mercadopago.com.ar; \
     frame-ancestors 'none'; \
     upgrade-insecure-requests";

pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CONTENT_SECURITY_POLICY_VALUE),
    );
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "camera=(), geolocation=(), microphone=(), payment=(), usb=(), \
             browsing-topics=(), interest-cohort=()",
        ),
    );

    // Pages carry cart and account details.
    if !headers.contains_key("cache-control") {
        headers.insert(
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store, max-age=0"),
        );
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    // CDN images do not send CORP headers.
    headers.insert(
        HeaderName::from_static("cross-origin-embedder-policy"),
        HeaderValue::from_static("credentialless"),
    );

    response
}
