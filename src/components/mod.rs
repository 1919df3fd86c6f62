mod payment_button;
mod purchase_form;

pub use payment_button::*;
pub use purchase_form::*;

use web_sys::HtmlInputElement;
use yew::prelude::*;

/// A simple, styled button that shows a spinner while `loading`.
#[derive(Properties, PartialEq)]
pub struct ButtonProps {
    /// Button label text
    pub label: String,
    /// Click handler
    pub onclick: Callback<MouseEvent>,
    /// Disable state
    #[prop_or_default]
    pub disabled: bool,
    #[prop_or_default]
    pub loading: bool,
}

#[function_component(Button)]
pub fn button(props: &ButtonProps) -> Html {
    html! {
        <button
            type="button"
            onclick={props.onclick.clone()}
            disabled={props.disabled || props.loading}
            class="btn-labster-regular"
        >
            if props.loading {
                <><i class="fa fa-spinner fa-spin"></i>{ "\u{00a0}\u{00a0}" }</>
            }
            { &props.label }
        </button>
    }
}

/// A controlled text input with an inline validation message.
#[derive(Properties, PartialEq)]
pub struct TextInputProps {
    /// Current value
    pub value: String,
    /// Emits new value on each keystroke
    pub oninput: Callback<String>,
    #[prop_or_default]
    pub placeholder: String,
    /// Shown under the field when non-empty
    #[prop_or_default]
    pub error: String,
}

#[function_component(TextInput)]
pub fn text_input(props: &TextInputProps) -> Html {
    let oninput = props.oninput.clone();
    html! {
        <div class="form-group">
            <input
                type="text"
                class={classes!("form-control", (!props.error.is_empty()).then_some("has-error"))}
                value={props.value.clone()}
                placeholder={props.placeholder.clone()}
                oninput={Callback::from(move |e: InputEvent| {
                    let input: HtmlInputElement = e.target_unchecked_into();
                    oninput.emit(input.value());
                })}
            />
            if !props.error.is_empty() {
                <span class="help-block text-danger">{ &props.error }</span>
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct ProgressDialogProps {
    pub message: String,
    /// `None` hides the close button and ignores backdrop clicks.
    #[prop_or_default]
    pub on_close: Option<Callback<()>>,
}

/// Modal overlay. Without `on_close` it cannot be dismissed by the user.
#[function_component(ProgressDialog)]
pub fn progress_dialog(props: &ProgressDialogProps) -> Html {
    let on_backdrop = props.on_close.clone().map(|cb| {
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            cb.emit(());
        })
    });
    html! {
        <div class="ngdialog ngdialog-theme-default">
            <div class="ngdialog-overlay" onclick={on_backdrop.clone()}></div>
            <div class="ngdialog-content" role="dialog">
                <h2 class="align-center">{ &props.message }</h2>
                if let Some(on_close) = on_backdrop {
                    <button type="button" class="ngdialog-close" onclick={on_close}></button>
                }
            </div>
        </div>
    }
}
