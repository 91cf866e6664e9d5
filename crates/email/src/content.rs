//! Shared email content templates
//!
//! Canonical content generators for the account-confirmation and
//! credential-recovery emails, used by both production (SES) and mock
//! email services.

/// Generate plain-text body for an account confirmation email.
pub fn confirmation_text(confirmation_url: &str) -> String {
    format!(
        "Welcome!\n\n\
        Click the link below to confirm your account:\n\
        {}\n\n\
        This link will expire in 24 hours.\n\n\
        If you didn't create an account, you can safely ignore this email.\n\n\
        Thanks,\n\
        The Meridian Team",
        confirmation_url
    )
}

/// Generate styled HTML body for an account confirmation email.
pub fn confirmation_html(confirmation_url: &str) -> String {
    format!(
        r#"
            <html>
            <body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
                <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
                    <h2 style="color: #007cba;">Confirm your account</h2>

                    <p>Welcome!</p>

                    <div style="text-align: center; margin: 30px 0;">
                        <a href="{confirmation_url}"
                           style="background-color: #007cba; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px; display: inline-block; font-weight: bold;">
                            Confirm Account
                        </a>
                    </div>

                    <p>Or copy and paste this link in your browser:</p>
                    <p style="background-color: #f5f5f5; padding: 10px; border-radius: 4px; word-break: break-all;">
                        <a href="{confirmation_url}">{confirmation_url}</a>
                    </p>

                    <p style="color: #666; font-size: 14px;">
                        <em>This link will expire in 24 hours.</em>
                    </p>

                    <hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">

                    <p style="color: #666; font-size: 12px;">
                        If you didn't create an account, you can safely ignore this email.<br>
                        Thanks, The Meridian Team
                    </p>
                </div>
            </body>
            </html>
            "#,
        confirmation_url = confirmation_url,
    )
}

/// Generate plain-text body for a credential recovery email.
pub fn recovery_text(recovery_url: &str) -> String {
    format!(
        "Hi there,\n\n\
        We received a request to recover access to your account.\n\n\
        Click the link below to continue:\n\
        {}\n\n\
        This link will expire in 1 hour.\n\n\
        If you didn't request this, you can safely ignore this email.\n\n\
        Thanks,\n\
        The Meridian Team",
        recovery_url
    )
}

/// Generate styled HTML body for a credential recovery email.
pub fn recovery_html(recovery_url: &str) -> String {
    format!(
        r#"
            <html>
            <body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
                <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
                    <h2 style="color: #007cba;">Recover your account</h2>

                    <p>Hi there,</p>

                    <p>We received a request to recover access to your account.</p>

                    <div style="text-align: center; margin: 30px 0;">
                        <a href="{recovery_url}"
                           style="background-color: #007cba; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px; display: inline-block; font-weight: bold;">
                            Recover Account
                        </a>
                    </div>

                    <p>Or copy and paste this link in your browser:</p>
                    <p style="background-color: #f5f5f5; padding: 10px; border-radius: 4px; word-break: break-all;">
                        <a href="{recovery_url}">{recovery_url}</a>
                    </p>

                    <p style="color: #666; font-size: 14px;">
                        <em>This link will expire in 1 hour.</em>
                    </p>

                    <hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">

                    <p style="color: #666; font-size: 12px;">
                        If you didn't request this, you can safely ignore this email.<br>
                        Thanks, The Meridian Team
                    </p>
                </div>
            </body>
            </html>
            "#,
        recovery_url = recovery_url,
    )
}
