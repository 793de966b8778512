//! # OpenID extensions
//! Simple Registration and Attribute Exchange, the two ways of asking a provider for profile data.

pub mod ax;
pub mod sreg;

use crate::message::Message;

pub use ax::{AttrInfo, FetchRequest, FetchResponse, AX_NS};
pub use sreg::{SRegRequest, SRegResponse, SREG_1_0_NS, SREG_1_1_NS};

/// A request extension that can be attached to an outgoing authentication request
pub trait Extension {
    /// Namespace uri of the extension
    fn ns_uri(&self) -> &str;

    /// Arguments of the extension, keyed without namespace alias
    fn extension_args(&self) -> Vec<(String, String)>;

    /// Writes the extension arguments into `message`
    fn to_message(&self, message: &mut Message) {
        for (key, value) in self.extension_args() {
            message.set_arg(self.ns_uri(), &key, value);
        }
    }
}
