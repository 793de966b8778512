use crate::helpers::escape_html;

use super::{AUTH_STATE_PARAM, IDENTIFIER_PARAM};

/// Page asking the user for an OpenID
pub(crate) fn consumer_page(action: &str, error: Option<&str>, auth_state: &str) -> String {
    let error = error
        .map(|e| format!("<div class=\"error\">{}</div>\n", escape_html(e)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>OpenID Login</title></head>
<body>
{error}<form method="get" action="{action}">
<fieldset>
<legend>OpenID Login</legend>
Identity&nbsp;URL:
<input type="hidden" name="action" value="verify" />
<input id="openid-identifier" class="openid-identifier" type="text" name="{IDENTIFIER_PARAM}" value="http://" />
<input type="hidden" name="{AUTH_STATE_PARAM}" value="{auth_state}" />
<input type="submit" value="Login with OpenID" />
</fieldset>
</form>
<p style="margin-top: 2em">
OpenID is a free and easy way to use a single digital identity across the Internet. Enter your OpenID identity URL in the box above to authenticate.
</p>
</body>
</html>
"#,
        action = escape_html(action),
        auth_state = escape_html(auth_state),
    )
}

/// Page posting `form_html` to the provider as soon as it loads
pub(crate) fn transaction_page(form_id: &str, form_html: &str) -> String {
    format!(
        "<html><head><title>OpenID transaction in progress</title></head>\n\
         <body onload='document.getElementById(\"{form_id}\").submit()'>{form_html}</body></html>"
    )
}
