use crate::config::GatewayConfig;
use crate::domain::address::Address;
use crate::domain::browser::RequestContext;
use crate::domain::gateway::{FormFields, VPS_PROTOCOL};
use crate::domain::transaction::TransactionRequest;
use crate::error::{GatewayError, Result};

/// Maps a validated transaction onto the gateway's registration field set.
pub struct PayloadBuilder<'a> {
    config: &'a GatewayConfig,
    context: &'a RequestContext,
}

impl<'a> PayloadBuilder<'a> {
    pub fn new(config: &'a GatewayConfig, context: &'a RequestContext) -> Self {
        Self { config, context }
    }

    /// `vendor_tx_code` is the code already resolved for this attempt.
    pub fn build(&self, request: &TransactionRequest, vendor_tx_code: &str) -> Result<FormFields> {
        let description = request
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| Some(self.config.description.as_str()).filter(|d| !d.trim().is_empty()))
            .ok_or_else(|| GatewayError::validation("A transaction description is required"))?;

        let card = &request.card;
        let brand = card
            .brand()
            .ok_or_else(|| GatewayError::validation("Card type is unresolved"))?;
        let browser = &request.browser;

        let mut fields = FormFields::new();
        let mut put = |name: &str, value: &str| {
            fields.insert(name.to_string(), value.to_string());
        };

        put("VPSProtocol", VPS_PROTOCOL);
        put("TxType", request.tx_type.code());
        put("Vendor", &self.config.vendor);
        put("VendorTxCode", vendor_tx_code);
        put("Amount", &request.amount.to_string());
        put("Currency", &request.currency);
        put("Description", description);

        put("CardHolder", card.holder());
        put("CardNumber", card.number());
        put("ExpiryDate", card.expiry());
        put("CV2", card.cv2());
        put("CardType", brand.code());

        put("CustomerEMail", request.customer_email.as_deref().unwrap_or_default());
        put(
            "ApplyAVSCV2",
            &request.apply_avs_cv2.unwrap_or(self.config.avs_cv2).to_string(),
        );
        put(
            "Apply3DSecure",
            &request
                .apply_3d_secure
                .unwrap_or(self.config.three_d_secure.apply)
                .to_string(),
        );
        put("CreateToken", "0");
        put("StoreToken", "0");
        put("ClientIPAddress", &self.context.client_ip);

        put("BrowserJavascriptEnabled", &browser.javascript_enabled);
        put("BrowserJavaEnabled", &browser.java_enabled);
        put("BrowserAcceptHeader", &browser.accept_header);
        put("BrowserLanguage", &browser.language);
        put("BrowserUserAgent", &browser.user_agent);
        put("BrowserColorDepth", &browser.color_depth);
        put("BrowserScreenHeight", &browser.screen_height);
        put("BrowserScreenWidth", &browser.screen_width);
        put("BrowserTZ", &browser.timezone);
        put("ChallengeWindowSize", &browser.challenge_window_size);
        put(
            "ThreeDSNotificationURL",
            &self
                .context
                .absolute_url(&self.config.three_d_secure.notification_url),
        );

        if let Some(xml) = &request.risk.acct_info_xml {
            put("AcctInfoXML", xml);
        }
        if let Some(xml) = &request.risk.merchant_risk_indicator_xml {
            put("MerchantRiskIndicatorXML", xml);
        }
        if let Some(xml) = &request.risk.prior_authentication_info_xml {
            put("ThreeDSRequestorPriorAuthenticationInfoXML", xml);
        }

        if brand.is_alternate_payment_method() {
            put(
                "PayPalCallbackURL",
                &self.context.absolute_url(&self.config.paypal_callback_url),
            );
            put("BillingAgreement", "0");
        }

        add_address(&mut fields, "Billing", &request.billing_address);
        add_address(&mut fields, "Delivery", &request.delivery_address);

        Ok(fields)
    }
}

fn add_address(fields: &mut FormFields, prefix: &str, address: &Address) {
    let mut put = |suffix: &str, value: &str| {
        fields.insert(format!("{}{}", prefix, suffix), value.to_string());
    };
    put("Surname", &address.surname);
    put("Firstnames", &address.first_names);
    put("Address1", &address.address1);
    put("Address2", &address.address2);
    put("City", &address.city);
    put("PostCode", &address.post_code);
    put("Country", &address.country);
    put("Phone", &address.phone);
    if let Some(state) = &address.state {
        put("State", state);
    }
}
